//! Disabilities: one entry/exit response pair per disability type.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::disability_type_name;
use hmis_model::lookup::DISABILITY_TYPES;
use hmis_model::{DisabilitiesMetadata, MetadataDocument, TableMetadata};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, info_span, warn};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::{filter_rows, int_values, key_values, take_column};
use crate::pivot::{StageIndex, stage_sources};

pub fn get_disabilities(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    clean_disabilities(SourceArgs::new(source, data_dir, paths), metadata).map(|(df, _)| df)
}

/// Pivots responses per disability type into `<Type>_entry` / `<Type>_exit`.
///
/// Only types present in the data produce columns, in dictionary order.
/// Rows with a missing or unknown type code are dropped with a warning.
pub fn clean_disabilities(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = DisabilitiesMetadata::from_document(metadata)?;
    let span = info_span!("disabilities", table = metadata.table());
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
            ("type_column", meta.type_column.as_str()),
            ("response_column", meta.response_column.as_str()),
        ],
    )?;

    let codes = int_values(&df, &meta.type_column)?;
    let known: Vec<bool> = codes
        .iter()
        .map(|code| code.and_then(disability_type_name).is_some())
        .collect();
    let unknown = known.iter().filter(|known| !**known).count();
    if unknown > 0 {
        warn!(count = unknown, column = %meta.type_column, "dropping unknown disability types");
        report.add_warning(format!(
            "{unknown} row(s) with an unknown disability type in '{}' dropped",
            meta.type_column
        ));
    }
    let df = filter_rows(&df, &known)?;
    let codes: Vec<Option<i64>> = codes
        .into_iter()
        .zip(&known)
        .filter_map(|(code, keep)| keep.then_some(code))
        .collect();

    let mut indices: Vec<(&str, StageIndex)> = Vec::new();
    for (code, name) in DISABILITY_TYPES {
        if !codes.contains(&Some(*code)) {
            continue;
        }
        let index = StageIndex::build(&df, &meta.stages, &meta.person_enrollment_id, |row| {
            codes[row] == Some(*code)
        })?;
        indices.push((*name, index));
    }

    let anchored: HashSet<&str> = indices
        .iter()
        .flat_map(|(_, index)| index.anchored_ids())
        .collect();
    let mut first_rows: HashMap<String, usize> = HashMap::new();
    let mut ids: Vec<String> = Vec::new();
    for (row, id) in key_values(&df, &meta.person_enrollment_id)?
        .into_iter()
        .enumerate()
    {
        if let Some(id) = id
            && anchored.contains(id.as_str())
            && !first_rows.contains_key(&id)
        {
            first_rows.insert(id.clone(), row);
            ids.push(id);
        }
    }
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let id_rows: Vec<Option<usize>> = ids.iter().map(|id| first_rows.get(id).copied()).collect();

    let response = df.column(&meta.response_column)?;
    let mut columns: Vec<Column> = Vec::with_capacity(1 + indices.len() * 2);
    columns.push(take_column(
        df.column(&meta.person_enrollment_id)?,
        &id_rows,
        &meta.person_enrollment_id,
    )?);
    for (name, index) in &indices {
        let (entry_rows, exit_rows) = stage_sources(index, &id_refs);
        columns.push(take_column(response, &entry_rows, &format!("{name}_entry"))?);
        columns.push(take_column(response, &exit_rows, &format!("{name}_exit"))?);
    }
    let pivoted = DataFrame::new(columns)?;
    debug!(
        types = indices.len(),
        enrollments = pivoted.height(),
        "pivoted disabilities"
    );
    report.rows_kept = pivoted.height();
    Ok((pivoted, report))
}
