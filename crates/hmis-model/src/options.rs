//! Options controlling a merge run.

use serde::{Deserialize, Serialize};

/// Default window, in days, inside which two client DOBs count as the same.
pub const DEFAULT_DOB_TOLERANCE_DAYS: i64 = 30;

/// DOBs before this year are treated as data-entry errors during the merge.
pub const DEFAULT_MIN_DOB_YEAR: i32 = 1900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Collapse enrollments sharing a group ID to one row per group.
    pub groups: bool,
    /// Drop client records whose name fields hold the placeholder.
    pub name_exclusion: bool,
    pub dob_tolerance_days: i64,
    pub min_dob_year: i32,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            groups: true,
            name_exclusion: false,
            dob_tolerance_days: DEFAULT_DOB_TOLERANCE_DAYS,
            min_dob_year: DEFAULT_MIN_DOB_YEAR,
        }
    }
}

impl MergeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(mut self, groups: bool) -> Self {
        self.groups = groups;
        self
    }

    pub fn with_name_exclusion(mut self, enable: bool) -> Self {
        self.name_exclusion = enable;
        self
    }

    pub fn with_dob_tolerance_days(mut self, days: i64) -> Self {
        self.dob_tolerance_days = days;
        self
    }

    pub fn with_min_dob_year(mut self, year: i32) -> Self {
        self.min_dob_year = year;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = MergeOptions::default();
        assert!(options.groups);
        assert!(!options.name_exclusion);
        assert_eq!(options.dob_tolerance_days, 30);
        assert_eq!(options.min_dob_year, 1900);
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let options: MergeOptions =
            serde_json::from_str(r#"{"name_exclusion": true}"#).expect("options");
        assert!(options.groups);
        assert!(options.name_exclusion);
        assert_eq!(options.dob_tolerance_days, 30);
    }

    #[test]
    fn builders_override_defaults() {
        let options = MergeOptions::new()
            .with_groups(false)
            .with_dob_tolerance_days(7)
            .with_min_dob_year(1920);
        assert!(!options.groups);
        assert_eq!(options.dob_tolerance_days, 7);
        assert_eq!(options.min_dob_year, 1920);
    }
}
