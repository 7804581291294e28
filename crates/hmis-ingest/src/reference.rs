//! Destination mapping reference file.

use std::path::{Path, PathBuf};

use hmis_common::parse_i64;
use hmis_model::destination::parse_subsidy;
use hmis_model::{CURRENT_STANDARD, DestinationMap, DestinationMapping};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{IngestError, Result};

/// Environment variable for overriding the destination mapping file.
pub const DESTINATION_MAP_ENV_VAR: &str = "HMIS_DESTINATION_MAP";

/// Location of the destination mapping shipped with the workspace.
///
/// Resolution order:
/// 1. `HMIS_DESTINATION_MAP` environment variable
/// 2. `data/destination_mappings.csv` relative to workspace root
pub fn default_destination_path() -> PathBuf {
    if let Ok(path) = std::env::var(DESTINATION_MAP_ENV_VAR) {
        return PathBuf::from(path);
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/destination_mappings.csv")
}

#[derive(Debug, Deserialize)]
struct DestinationRecord {
    #[serde(rename = "Standard")]
    standard: String,
    #[serde(rename = "DestinationNumeric")]
    numeric: String,
    #[serde(rename = "DestinationDescription")]
    description: String,
    #[serde(rename = "DestinationGroup")]
    group: String,
    #[serde(rename = "DestinationSuccess")]
    success: String,
    #[serde(rename = "Subsidy")]
    subsidy: String,
}

/// Loads the rows tagged with the current standard.
pub fn load_destination_map(path: &Path) -> Result<DestinationMap> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|err| csv_error(path, &err))?;
    let mut map = DestinationMap::new();
    for record in reader.deserialize::<DestinationRecord>() {
        let record = record.map_err(|err| csv_error(path, &err))?;
        if record.standard != CURRENT_STANDARD {
            continue;
        }
        let Some(code) = parse_i64(&record.numeric) else {
            warn!(value = %record.numeric, "skipping destination row with non-numeric code");
            continue;
        };
        let subsidy = parse_subsidy(&record.subsidy).unwrap_or_else(|| {
            warn!(code, value = %record.subsidy, "unrecognised subsidy flag, treating as No");
            false
        });
        map.insert(DestinationMapping {
            code,
            description: record.description,
            group: record.group,
            success: record.success,
            subsidy,
        });
    }
    debug!(path = %path.display(), codes = map.len(), "loaded destination mappings");
    Ok(map)
}

fn csv_error(path: &Path, err: &csv::Error) -> IngestError {
    IngestError::CsvParse {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
