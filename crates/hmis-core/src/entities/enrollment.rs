use std::collections::HashSet;
use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::{EnrollmentMetadata, MetadataDocument, TableMetadata};
use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::{filter_rows, key_values};

/// Loads enrollments, optionally collapsing each group to its first row.
pub fn get_enrollment(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
    groups: bool,
) -> Result<DataFrame> {
    clean_enrollment(SourceArgs::new(source, data_dir, paths), metadata, groups).map(|(df, _)| df)
}

pub fn clean_enrollment(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
    groups: bool,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = EnrollmentMetadata::from_document(metadata)?;
    let span = info_span!("enrollment", table = metadata.table());
    let _guard = span.enter();

    let (df, mut report) = load(
        args,
        &meta.cleaning,
        metadata.table(),
        &[
            ("person_enrollment_ID", meta.person_enrollment_id.as_str()),
            ("person_ID", meta.person_id.as_str()),
            ("program_ID", meta.program_id.as_str()),
            ("groupID_column", meta.group_id_column.as_str()),
            ("entry_date", meta.entry_date.as_str()),
        ],
    )?;
    if !groups {
        return Ok((df, report));
    }
    let df = collapse_groups(&df, &meta.group_id_column)?;
    report.rows_kept = df.height();
    Ok((df, report))
}

/// Keeps the first row of each group. Rows without a group ID are kept.
fn collapse_groups(df: &DataFrame, group_column: &str) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let keep: Vec<bool> = key_values(df, group_column)?
        .into_iter()
        .map(|group| match group {
            Some(group) => seen.insert(group),
            None => true,
        })
        .collect();
    let collapsed = filter_rows(df, &keep)?;
    debug!(
        before = df.height(),
        after = collapsed.height(),
        "collapsed enrollment groups"
    );
    Ok(collapsed)
}
