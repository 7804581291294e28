//! Generic entry/exit tables: employment/education and health/DV.

use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::{EntryExitMetadata, MetadataDocument, TableMetadata};
use polars::prelude::DataFrame;
use tracing::info_span;

use super::{SourceArgs, load};
use crate::error::Result;
use crate::pivot::pivot_by_stage;

/// Loads a stage-indexed table and pivots every other column to entry/exit.
pub fn read_entry_exit_table(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    clean_entry_exit_table(SourceArgs::new(source, data_dir, paths), metadata).map(|(df, _)| df)
}

pub fn clean_entry_exit_table(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = EntryExitMetadata::from_document(metadata)?;
    let span = info_span!("entry_exit", table = metadata.table());
    let _guard = span.enter();

    let (df, mut report) = load(
        args,
        &meta.cleaning,
        metadata.table(),
        &[
            ("person_enrollment_ID", meta.person_enrollment_id.as_str()),
            (
                "collection_stage_column",
                meta.stages.collection_stage_column.as_str(),
            ),
        ],
    )?;
    let values: Vec<String> = df
        .get_column_names_str()
        .into_iter()
        .filter(|name| {
            *name != meta.person_enrollment_id && *name != meta.stages.collection_stage_column
        })
        .map(str::to_string)
        .collect();
    let pivoted = pivot_by_stage(&df, &meta.stages, &meta.person_enrollment_id, &values)?;
    report.rows_kept = pivoted.height();
    Ok((pivoted, report))
}

pub fn get_employment_education(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    read_entry_exit_table(source, data_dir, paths, metadata)
}

pub fn get_health_dv(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    read_entry_exit_table(source, data_dir, paths, metadata)
}
