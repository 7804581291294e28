//! Configuration errors shared by every pipeline stage.

use std::path::PathBuf;
use thiserror::Error;

/// A problem with metadata, source specification or declared columns.
///
/// These are raised before any data is transformed and always name the
/// offending key, path or table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// One or more required metadata keys are absent.
    #[error("metadata for '{table}' is missing required keys: {}", .keys.join(", "))]
    MissingKeys { table: String, keys: Vec<String> },

    /// Keys are present but a value has the wrong shape.
    #[error("invalid metadata for '{table}': {reason}")]
    InvalidMetadata { table: String, reason: String },

    /// The table source was specified in two incompatible ways.
    #[error("ambiguous table source: {reason}")]
    AmbiguousSource { reason: String },

    /// A bare file name was given without a data directory and year paths.
    #[error("file name '{file_name}' requires both a data directory and year paths")]
    MissingSourceContext { file_name: String },

    /// A resolved year directory does not exist.
    #[error("directory not found: {path}")]
    MissingDirectory { path: PathBuf },

    /// A column named in metadata is absent from the data.
    #[error("column '{column}' named by '{key}' is not present in '{table}'")]
    MissingColumn {
        table: String,
        key: String,
        column: String,
    },

    /// A table name that the pipeline does not know.
    #[error("unknown table '{name}'")]
    UnknownTable { name: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
