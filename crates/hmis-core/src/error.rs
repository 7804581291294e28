use hmis_ingest::IngestError;
use hmis_model::ConfigError;
use thiserror::Error;

/// Errors raised by cleaners and the merge.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Metadata, source or column configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File or parse failure while loading a table.
    #[error(transparent)]
    Ingest(IngestError),

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },

    /// A join changed the number of spine rows.
    #[error("joining '{table}' produced {actual} rows, expected {expected}")]
    Cardinality {
        table: String,
        expected: usize,
        actual: usize,
    },
}

impl From<IngestError> for CoreError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Config(config) => CoreError::Config(config),
            other => CoreError::Ingest(other),
        }
    }
}

impl From<polars::prelude::PolarsError> for CoreError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
