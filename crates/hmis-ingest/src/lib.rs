//! Extract ingestion: source resolution, CSV reading, type coercion,
//! deduplication and reference data loading.

pub mod coerce;
pub mod csv_table;
pub mod dedupe;
pub mod error;
pub mod metadata;
pub mod read;
pub mod reference;
pub mod report;
pub mod source;

pub use csv_table::{CsvTable, read_csv_table};
pub use dedupe::dedupe_frame_by_keys;
pub use error::{IngestError, Result};
pub use metadata::{load_metadata, load_table_metadata};
pub use read::{read_table, read_table_with_report};
pub use reference::{default_destination_path, load_destination_map};
pub use report::CleaningReport;
pub use source::{TableSource, std_path_setup};
