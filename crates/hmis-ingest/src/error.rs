//! Error types for extract ingestion.

use std::path::PathBuf;

use hmis_model::ConfigError;
use thiserror::Error;

/// Errors that can occur while loading a table.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Metadata or source specification problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    // === File System Errors ===
    /// Extract, metadata or reference file not found.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Parsing Errors ===
    /// Malformed CSV.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// Metadata file is not valid JSON.
    #[error("failed to parse metadata {path}: {message}")]
    MetadataParse { path: PathBuf, message: String },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IngestError::FileNotFound {
            path: PathBuf::from("/data/2011/Exit.csv"),
        };
        assert_eq!(err.to_string(), "file not found: /data/2011/Exit.csv");
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: IngestError = ConfigError::UnknownTable {
            name: "services".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "unknown table 'services'");
    }

    #[test]
    fn test_error_from_polars() {
        let polars_err = polars::prelude::PolarsError::ColumnNotFound("test".into());
        let ingest_err: IngestError = polars_err.into();
        assert!(matches!(ingest_err, IngestError::DataFrame { .. }));
    }
}
