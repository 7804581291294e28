//! Table-family cleaners built on the loader and the stage pivot.
//!
//! Each cleaner validates its metadata before opening any file, then loads
//! the table through [`hmis_ingest::read_table_with_report`] and applies its
//! own transform. The `get_*` functions return the cleaned frame; the
//! `clean_*` variants also return the [`CleaningReport`].

pub mod client;
pub mod disabilities;
pub mod enrollment;
pub mod episodes;
pub mod exit;
pub mod income;
pub mod project;

use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource, read_table_with_report};
use hmis_model::CleaningSpec;
use polars::prelude::DataFrame;

use crate::error::Result;
use crate::frame_utils::require_column;

pub use client::{ClientTable, clean_client, get_client};
pub use disabilities::{clean_disabilities, get_disabilities};
pub use enrollment::{clean_enrollment, get_enrollment};
pub use episodes::{
    clean_entry_exit_table, get_employment_education, get_health_dv, read_entry_exit_table,
};
pub use exit::{clean_exit, get_exit};
pub use income::{clean_income, get_income};
pub use project::{clean_project, get_project};

/// Where a cleaner reads its table from.
#[derive(Debug, Clone, Copy)]
pub struct SourceArgs<'a> {
    pub source: &'a TableSource,
    pub data_dir: Option<&'a Path>,
    pub paths: Option<&'a [String]>,
}

impl<'a> SourceArgs<'a> {
    pub fn new(
        source: &'a TableSource,
        data_dir: Option<&'a Path>,
        paths: Option<&'a [String]>,
    ) -> Self {
        Self {
            source,
            data_dir,
            paths,
        }
    }
}

/// Loads a table and checks that each `(metadata key, column)` pair names a
/// column in the data.
pub(crate) fn load(
    args: SourceArgs<'_>,
    cleaning: &CleaningSpec,
    table: &str,
    columns: &[(&str, &str)],
) -> Result<(DataFrame, CleaningReport)> {
    let (df, mut report) =
        read_table_with_report(args.source, args.data_dir, args.paths, cleaning)?;
    report.table = table.to_string();
    for (key, column) in columns {
        require_column(&df, table, key, column)?;
    }
    Ok((df, report))
}
