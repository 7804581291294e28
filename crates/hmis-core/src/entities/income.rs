use std::collections::HashMap;
use std::path::Path;

use hmis_common::any_to_f64;
use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::{IncomeMetadata, MetadataDocument, TableMetadata};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, info_span};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::{key_values, take_column};
use crate::pivot::pivot_by_stage;

pub fn get_income(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    clean_income(SourceArgs::new(source, data_dir, paths), metadata).map(|(df, _)| df)
}

/// Collapses repeated (enrollment, stage) rows, then pivots to entry/exit.
pub fn clean_income(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = IncomeMetadata::from_document(metadata)?;
    let span = info_span!("income", table = metadata.table());
    let _guard = span.enter();

    let mut required = vec![
        ("person_enrollment_ID", meta.person_enrollment_id.as_str()),
        (
            "collection_stage_column",
            meta.stages.collection_stage_column.as_str(),
        ),
    ];
    required.extend(
        meta.columns_to_take_max
            .iter()
            .map(|column| ("columns_to_take_max", column.as_str())),
    );
    let (df, mut report) = load(args, &meta.cleaning, metadata.table(), &required)?;

    let collapsed = collapse_stage_rows(&df, &meta)?;
    debug!(
        before = df.height(),
        after = collapsed.height(),
        "collapsed income rows per stage"
    );
    let values: Vec<String> = collapsed
        .get_column_names_str()
        .into_iter()
        .filter(|name| {
            *name != meta.person_enrollment_id && *name != meta.stages.collection_stage_column
        })
        .map(str::to_string)
        .collect();
    let pivoted = pivot_by_stage(
        &collapsed,
        &meta.stages,
        &meta.person_enrollment_id,
        &values,
    )?;
    report.rows_kept = pivoted.height();
    Ok((pivoted, report))
}

/// Row groups sharing an ID and stage, in order of first appearance.
///
/// Rows with a null ID or stage stay on their own.
fn stage_groups(df: &DataFrame, meta: &IncomeMetadata) -> Result<Vec<Vec<usize>>> {
    let ids = key_values(df, &meta.person_enrollment_id)?;
    let stages = key_values(df, &meta.stages.collection_stage_column)?;
    let mut positions: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row, key) in ids.into_iter().zip(stages).enumerate() {
        match key {
            (Some(id), Some(stage)) => match positions.get(&(id.clone(), stage.clone())) {
                Some(&position) => groups[position].push(row),
                None => {
                    positions.insert((id, stage), groups.len());
                    groups.push(vec![row]);
                }
            },
            _ => groups.push(vec![row]),
        }
    }
    Ok(groups)
}

fn max_row(column: &Column, rows: &[usize]) -> Result<Option<usize>> {
    let mut best: Option<(usize, f64)> = None;
    for &row in rows {
        if let Some(value) = any_to_f64(column.get(row)?)
            && best.is_none_or(|(_, current)| value > current)
        {
            best = Some((row, value));
        }
    }
    Ok(best.map(|(row, _)| row))
}

fn last_non_null_row(column: &Column, rows: &[usize]) -> Result<Option<usize>> {
    for &row in rows.iter().rev() {
        if !column.get(row)?.is_null() {
            return Ok(Some(row));
        }
    }
    Ok(None)
}

fn collapse_stage_rows(df: &DataFrame, meta: &IncomeMetadata) -> Result<DataFrame> {
    let groups = stage_groups(df, meta)?;
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().as_str();
        let mut sources = Vec::with_capacity(groups.len());
        for rows in &groups {
            let source = if name == meta.person_enrollment_id
                || name == meta.stages.collection_stage_column
            {
                rows.first().copied()
            } else if meta.columns_to_take_max.iter().any(|max| max == name) {
                max_row(column, rows)?
            } else {
                last_non_null_row(column, rows)?
            };
            sources.push(source);
        }
        columns.push(take_column(column, &sources, name)?);
    }
    Ok(DataFrame::new(columns)?)
}
