//! Loading metadata documents from JSON files.

use std::path::Path;

use hmis_model::{MetadataDocument, TableMetadata};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Reads a metadata document. `label` names the table when the document
/// has no `name` key.
pub fn load_metadata(path: &Path, label: &str) -> Result<MetadataDocument> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| IngestError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|err| IngestError::MetadataParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    let document = MetadataDocument::from_value(label, value)?;
    debug!(table = document.table(), path = %path.display(), "loaded metadata");
    Ok(document)
}

/// Reads and validates a typed metadata view.
pub fn load_table_metadata<T: TableMetadata>(path: &Path, label: &str) -> Result<T> {
    let document = load_metadata(path, label)?;
    Ok(T::from_document(&document)?)
}
