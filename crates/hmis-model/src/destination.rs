//! Exit destination reference data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Only reference rows tagged with this standard are used.
pub const CURRENT_STANDARD: &str = "New Standards";

/// Output columns produced by the destination lookup, in order.
pub const DESTINATION_NUMERIC: &str = "DestinationNumeric";
pub const DESTINATION_DESCRIPTION: &str = "DestinationDescription";
pub const DESTINATION_GROUP: &str = "DestinationGroup";
pub const DESTINATION_SUCCESS: &str = "DestinationSuccess";
pub const SUBSIDY: &str = "Subsidy";

/// One destination code and what it means.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationMapping {
    pub code: i64,
    pub description: String,
    /// Coarse group: `Temporary`, `Permanent` or `Other`.
    pub group: String,
    /// `Successful Exit` or `Other Exit`.
    pub success: String,
    pub subsidy: bool,
}

/// Destination codes keyed by their numeric value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestinationMap {
    entries: BTreeMap<i64, DestinationMapping>,
}

impl DestinationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mapping. A later mapping for the same code replaces the earlier one.
    pub fn insert(&mut self, mapping: DestinationMapping) {
        self.entries.insert(mapping.code, mapping);
    }

    pub fn get(&self, code: i64) -> Option<&DestinationMapping> {
        self.entries.get(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DestinationMapping> {
        self.entries.values()
    }
}

impl FromIterator<DestinationMapping> for DestinationMap {
    fn from_iter<T: IntoIterator<Item = DestinationMapping>>(iter: T) -> Self {
        let mut map = DestinationMap::new();
        for mapping in iter {
            map.insert(mapping);
        }
        map
    }
}

/// Parses the reference file's `Yes`/`No` subsidy flag.
pub fn parse_subsidy(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}
