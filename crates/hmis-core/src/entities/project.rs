use std::path::Path;

use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::{MetadataDocument, ProjectMetadata, TableMetadata, project_type_name};
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use tracing::{info_span, warn};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::int_values;

pub const PROJECT_NUMERIC: &str = "ProjectNumeric";
pub const PROJECT_TYPE: &str = "ProjectType";

pub fn get_project(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
) -> Result<DataFrame> {
    clean_project(SourceArgs::new(source, data_dir, paths), metadata).map(|(df, _)| df)
}

pub fn clean_project(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
) -> Result<(DataFrame, CleaningReport)> {
    let meta = ProjectMetadata::from_document(metadata)?;
    let span = info_span!("project", table = metadata.table());
    let _guard = span.enter();

    let (df, report) = load(
        args,
        &meta.cleaning,
        metadata.table(),
        &[
            ("program_ID", meta.program_id.as_str()),
            ("project_type_column", meta.project_type_column.as_str()),
        ],
    )?;
    let df = expand_project_type(&df, &meta.project_type_column)?;
    Ok((df, report))
}

/// Replaces the raw project type column with `ProjectNumeric` and `ProjectType`.
pub fn expand_project_type(df: &DataFrame, type_column: &str) -> Result<DataFrame> {
    let codes = int_values(df, type_column)?;
    let names: Vec<Option<&str>> = codes
        .iter()
        .map(|code| code.and_then(project_type_name))
        .collect();
    let unknown = codes
        .iter()
        .zip(&names)
        .filter(|(code, name)| code.is_some() && name.is_none())
        .count();
    if unknown > 0 {
        warn!(count = unknown, "project type codes without a name");
    }

    let mut expanded = Some([
        Column::from(Series::new(PROJECT_NUMERIC.into(), codes)),
        Column::from(Series::new(PROJECT_TYPE.into(), names)),
    ]);
    let mut columns: Vec<Column> = Vec::with_capacity(df.width() + 1);
    for column in df.get_columns() {
        if column.name().as_str() == type_column {
            if let Some(expanded) = expanded.take() {
                columns.extend(expanded);
            }
        } else {
            columns.push(column.clone());
        }
    }
    Ok(DataFrame::new(columns)?)
}
