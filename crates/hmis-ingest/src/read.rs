//! The generic table loader.

use std::path::Path;

use hmis_model::{CleaningSpec, ConfigError};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span};

use crate::coerce::{build_frame, union_headers};
use crate::csv_table::read_csv_table;
use crate::dedupe::dedupe_frame_by_keys;
use crate::error::Result;
use crate::report::CleaningReport;
use crate::source::TableSource;

/// Loads, stacks and cleans a table.
///
/// See [`read_table_with_report`] for the data-quality counts.
pub fn read_table(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    spec: &CleaningSpec,
) -> Result<DataFrame> {
    read_table_with_report(source, data_dir, paths, spec).map(|(df, _)| df)
}

/// Loads a table and reports what cleaning changed.
///
/// Yearly files are read in year-label order and stacked before cleaning.
/// Then listed columns are dropped, time and categorical columns are coerced,
/// and rows are deduplicated on `duplicate_check_columns`.
pub fn read_table_with_report(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    spec: &CleaningSpec,
) -> Result<(DataFrame, CleaningReport)> {
    let table = source.label();
    let span = info_span!("read_table", table = %table);
    let _guard = span.enter();

    let files = source.resolve(data_dir, paths)?;
    let mut tables = Vec::with_capacity(files.len());
    for (label, path) in &files {
        let csv = read_csv_table(path)?;
        debug!(year = %label, path = %path.display(), rows = csv.rows.len(), "read extract");
        tables.push(csv);
    }

    let headers = union_headers(&tables);
    let kept = |name: &String| headers.contains(name) && !spec.columns_to_drop.contains(name);
    for column in &spec.duplicate_check_columns {
        if !kept(column) {
            return Err(ConfigError::MissingColumn {
                table: table.clone(),
                key: "duplicate_check_columns".to_string(),
                column: column.clone(),
            }
            .into());
        }
    }
    if let Some(column) = &spec.dedup_tiebreak_column
        && !kept(column)
    {
        return Err(ConfigError::MissingColumn {
            table: table.clone(),
            key: "dedup_tiebreak_column".to_string(),
            column: column.clone(),
        }
        .into());
    }

    let mut report = CleaningReport::new(table.clone());
    report.rows_read = tables.iter().map(|t| t.rows.len()).sum();
    let df = build_frame(&tables, spec, &mut report)?;
    let (df, dropped) = dedupe_frame_by_keys(
        &df,
        &spec.duplicate_check_columns,
        spec.dedup_tiebreak_column.as_deref(),
    )?;
    report.duplicates_dropped = dropped;
    report.rows_kept = df.height();
    info!(
        rows_read = report.rows_read,
        rows_kept = report.rows_kept,
        duplicates = dropped,
        "table cleaned"
    );
    Ok((df, report))
}
