use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::destination::{
    DESTINATION_DESCRIPTION, DESTINATION_GROUP, DESTINATION_NUMERIC, DESTINATION_SUCCESS, SUBSIDY,
};
use hmis_model::{DestinationMap, ExitMetadata, MetadataDocument, TableMetadata};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use tracing::{info_span, warn};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::int_values;

/// Loads exits and expands the destination code through `destinations`.
pub fn get_exit(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
    destinations: &DestinationMap,
) -> Result<DataFrame> {
    clean_exit(SourceArgs::new(source, data_dir, paths), metadata, destinations).map(|(df, _)| df)
}

pub fn clean_exit(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
    destinations: &DestinationMap,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = ExitMetadata::from_document(metadata)?;
    let span = info_span!("exit", table = metadata.table());
    let _guard = span.enter();

    let (df, report) = load(
        args,
        &meta.cleaning,
        metadata.table(),
        &[
            ("person_enrollment_ID", meta.person_enrollment_id.as_str()),
            ("destination_column", meta.destination_column.as_str()),
        ],
    )?;
    let df = expand_destinations(&df, &meta.destination_column, destinations)?;
    Ok((df, report))
}

/// Replaces the raw destination column with the code and its lookup columns.
pub fn expand_destinations(
    df: &DataFrame,
    destination_column: &str,
    destinations: &DestinationMap,
) -> Result<DataFrame> {
    let codes = int_values(df, destination_column)?;
    let mut descriptions: Vec<Option<String>> = Vec::with_capacity(codes.len());
    let mut groups: Vec<Option<String>> = Vec::with_capacity(codes.len());
    let mut successes: Vec<Option<String>> = Vec::with_capacity(codes.len());
    let mut subsidies: Vec<Option<bool>> = Vec::with_capacity(codes.len());
    let mut unknown = 0usize;
    for code in &codes {
        let mapping = code.and_then(|code| destinations.get(code));
        if mapping.is_none() && code.is_some() {
            unknown += 1;
        }
        descriptions.push(mapping.map(|m| m.description.clone()));
        groups.push(mapping.map(|m| m.group.clone()));
        successes.push(mapping.map(|m| m.success.clone()));
        subsidies.push(mapping.map(|m| m.subsidy));
    }
    if unknown > 0 {
        warn!(count = unknown, "destination codes without a mapping");
    }

    let expanded: Vec<Column> = vec![
        Series::new(DESTINATION_NUMERIC.into(), codes).into(),
        Series::new(DESTINATION_DESCRIPTION.into(), descriptions).into(),
        Series::new(DESTINATION_GROUP.into(), groups).into(),
        Series::new(DESTINATION_SUCCESS.into(), successes).into(),
        Series::new(SUBSIDY.into(), subsidies).into(),
    ];
    let mut columns: Vec<Column> = Vec::with_capacity(df.width() + expanded.len());
    let mut pending = Some(expanded);
    for column in df.get_columns() {
        if column.name().as_str() == destination_column {
            if let Some(expanded) = pending.take() {
                columns.extend(expanded);
            }
        } else {
            columns.push(column.clone());
        }
    }
    Ok(DataFrame::new(columns)?)
}
