use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::metadata::{
    ClientMetadata, DisabilitiesMetadata, EnrollmentMetadata, EntryExitMetadata, ExitMetadata,
    IncomeMetadata, ProjectMetadata, TableMetadata,
};

/// The source tables the merge consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Enrollment,
    Exit,
    Client,
    Disabilities,
    EmploymentEducation,
    #[serde(rename = "health_dv")]
    HealthDv,
    Income,
    Project,
}

impl TableKind {
    /// Every table, in merge order.
    pub const ALL: [TableKind; 8] = [
        TableKind::Enrollment,
        TableKind::Exit,
        TableKind::Client,
        TableKind::Disabilities,
        TableKind::EmploymentEducation,
        TableKind::HealthDv,
        TableKind::Income,
        TableKind::Project,
    ];

    /// Key used for this table in metadata file maps and run configs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Enrollment => "enrollment",
            TableKind::Exit => "exit",
            TableKind::Client => "client",
            TableKind::Disabilities => "disabilities",
            TableKind::EmploymentEducation => "employment_education",
            TableKind::HealthDv => "health_dv",
            TableKind::Income => "income",
            TableKind::Project => "project",
        }
    }

    /// Default extract file name inside each year directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            TableKind::Enrollment => "Enrollment.csv",
            TableKind::Exit => "Exit.csv",
            TableKind::Client => "Client.csv",
            TableKind::Disabilities => "Disabilities.csv",
            TableKind::EmploymentEducation => "EmploymentEducation.csv",
            TableKind::HealthDv => "HealthAndDV.csv",
            TableKind::Income => "IncomeBenefits.csv",
            TableKind::Project => "Project.csv",
        }
    }

    /// Metadata keys the cleaner for this table requires.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            TableKind::Enrollment => EnrollmentMetadata::REQUIRED_KEYS,
            TableKind::Exit => ExitMetadata::REQUIRED_KEYS,
            TableKind::Client => ClientMetadata::REQUIRED_KEYS,
            TableKind::Disabilities => DisabilitiesMetadata::REQUIRED_KEYS,
            TableKind::EmploymentEducation | TableKind::HealthDv => {
                EntryExitMetadata::REQUIRED_KEYS
            }
            TableKind::Income => IncomeMetadata::REQUIRED_KEYS,
            TableKind::Project => ProjectMetadata::REQUIRED_KEYS,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "enrollment" => Ok(TableKind::Enrollment),
            "exit" => Ok(TableKind::Exit),
            "client" => Ok(TableKind::Client),
            "disabilities" => Ok(TableKind::Disabilities),
            "employment_education" => Ok(TableKind::EmploymentEducation),
            "health_dv" => Ok(TableKind::HealthDv),
            "income" => Ok(TableKind::Income),
            "project" => Ok(TableKind::Project),
            _ => Err(ConfigError::UnknownTable {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in TableKind::ALL {
            assert_eq!(kind.as_str().parse::<TableKind>().unwrap(), kind);
        }
        assert_eq!(
            "Health-DV".parse::<TableKind>().unwrap(),
            TableKind::HealthDv
        );
    }

    #[test]
    fn unknown_table_is_config_error() {
        let err = "services".parse::<TableKind>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnknownTable {
                name: "services".to_string()
            }
        );
    }

    #[test]
    fn file_names_follow_extract_layout() {
        assert_eq!(TableKind::HealthDv.file_name(), "HealthAndDV.csv");
        assert_eq!(TableKind::Income.file_name(), "IncomeBenefits.csv");
    }

    #[test]
    fn every_table_requires_duplicate_check_columns() {
        for kind in TableKind::ALL {
            assert!(kind.required_keys().contains(&"duplicate_check_columns"));
        }
    }
}
