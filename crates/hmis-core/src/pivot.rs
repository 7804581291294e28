//! Collection-stage pivoting.
//!
//! Stage-indexed rows are split into cohorts by their collection stage and
//! projected onto one row per ID with `<value>_entry` and `<value>_exit`
//! columns. When an ID has no exit row, the exit side falls back to the most
//! recent annual assessment, then update, then post-exit row.

use std::collections::HashMap;

use hmis_model::{CollectionStage, StageSpec};
use polars::prelude::{Column, DataFrame};
use tracing::debug;

use crate::error::Result;
use crate::frame_utils::{int_values, key_values, require_column, take_column};

/// Latest row index seen for each stage of one ID.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageRows {
    pub entry: Option<usize>,
    pub exit: Option<usize>,
    pub update: Option<usize>,
    pub annual_assessment: Option<usize>,
    pub post_exit: Option<usize>,
}

impl StageRows {
    fn record(&mut self, stage: CollectionStage, row: usize) {
        let slot = match stage {
            CollectionStage::Entry => &mut self.entry,
            CollectionStage::Exit => &mut self.exit,
            CollectionStage::Update => &mut self.update,
            CollectionStage::AnnualAssessment => &mut self.annual_assessment,
            CollectionStage::PostExit => &mut self.post_exit,
        };
        *slot = Some(row);
    }

    /// Row supplying exit values.
    pub fn exit_source(&self) -> Option<usize> {
        self.exit
            .or(self.annual_assessment)
            .or(self.update)
            .or(self.post_exit)
    }

    /// Whether the ID belongs in pivoted output.
    pub fn is_anchored(&self) -> bool {
        self.entry.is_some() || self.exit.is_some()
    }
}

/// Stage rows per ID, plus IDs in order of first appearance.
#[derive(Debug, Default, Clone)]
pub struct StageIndex {
    order: Vec<String>,
    first_row: HashMap<String, usize>,
    rows: HashMap<String, StageRows>,
}

impl StageIndex {
    /// Indexes the rows of `df` selected by `include`.
    ///
    /// Rows with a null ID, or a null or unrecognised stage, are skipped.
    pub fn build(
        df: &DataFrame,
        stages: &StageSpec,
        id_column: &str,
        include: impl Fn(usize) -> bool,
    ) -> Result<Self> {
        let ids = key_values(df, id_column)?;
        let codes = int_values(df, &stages.collection_stage_column)?;
        let mut index = StageIndex::default();
        for (row, (id, code)) in ids.into_iter().zip(codes).enumerate() {
            if !include(row) {
                continue;
            }
            let (Some(id), Some(stage)) = (id, code.and_then(|code| stages.stage_of(code))) else {
                continue;
            };
            if !index.first_row.contains_key(&id) {
                index.first_row.insert(id.clone(), row);
                index.order.push(id.clone());
            }
            index.rows.entry(id).or_default().record(stage, row);
        }
        Ok(index)
    }

    pub fn get(&self, id: &str) -> Option<&StageRows> {
        self.rows.get(id)
    }

    pub fn first_row(&self, id: &str) -> Option<usize> {
        self.first_row.get(id).copied()
    }

    /// Anchored IDs in order of first appearance.
    pub fn anchored_ids(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.rows.get(*id).is_some_and(StageRows::is_anchored))
            .map(String::as_str)
            .collect()
    }
}

/// Entry and exit source rows for each output ID.
pub fn stage_sources(index: &StageIndex, ids: &[&str]) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    ids.iter()
        .map(|id| match index.get(id) {
            Some(rows) => (rows.entry, rows.exit_source()),
            None => (None, None),
        })
        .unzip()
}

/// Pivots `value_columns` of a stage-indexed table to entry/exit columns.
///
/// The output has the ID column, then `<v>_entry` and `<v>_exit` for each
/// value column in order. Value dtypes are preserved.
pub fn pivot_by_stage(
    df: &DataFrame,
    stages: &StageSpec,
    id_column: &str,
    value_columns: &[String],
) -> Result<DataFrame> {
    require_column(df, "pivot", "person_enrollment_ID", id_column)?;
    require_column(
        df,
        "pivot",
        "collection_stage_column",
        &stages.collection_stage_column,
    )?;
    for value in value_columns {
        require_column(df, "pivot", "value column", value)?;
    }

    let index = StageIndex::build(df, stages, id_column, |_| true)?;
    let ids = index.anchored_ids();
    let id_rows: Vec<Option<usize>> = ids.iter().map(|id| index.first_row(id)).collect();
    let (entry_rows, exit_rows) = stage_sources(&index, &ids);

    let mut columns: Vec<Column> = Vec::with_capacity(1 + value_columns.len() * 2);
    columns.push(take_column(df.column(id_column)?, &id_rows, id_column)?);
    for value in value_columns {
        let source = df.column(value)?;
        columns.push(take_column(source, &entry_rows, &format!("{value}_entry"))?);
        columns.push(take_column(source, &exit_rows, &format!("{value}_exit"))?);
    }
    debug!(input_rows = df.height(), output_rows = ids.len(), "pivoted by stage");
    Ok(DataFrame::new(columns)?)
}
