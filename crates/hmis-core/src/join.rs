//! Key-declared joins with explicit join kinds.

use std::collections::HashMap;

use polars::prelude::{Column, DataFrame};

use crate::error::Result;
use crate::frame_utils::{key_values, require_column, take_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Every left row survives; unmatched rows get nulls on the right.
    Left,
    /// Only matched rows survive.
    Inner,
}

/// Row pairing produced by a join: `left[i]` pairs with `right[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinIndices {
    pub left: Vec<usize>,
    pub right: Vec<Option<usize>>,
}

/// Pairs rows of `left` and `right` on their key columns.
///
/// Output follows left row order; a left row matching several right rows
/// yields one pair per match, in right row order. Null keys never match.
pub fn join_indices(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &str,
    right_on: &str,
    kind: JoinKind,
) -> Result<JoinIndices> {
    let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, key) in key_values(right, right_on)?.into_iter().enumerate() {
        if let Some(key) = key {
            lookup.entry(key).or_default().push(idx);
        }
    }
    let mut indices = JoinIndices::default();
    for (idx, key) in key_values(left, left_on)?.into_iter().enumerate() {
        match key.as_ref().and_then(|key| lookup.get(key)) {
            Some(matches) => {
                for right_idx in matches {
                    indices.left.push(idx);
                    indices.right.push(Some(*right_idx));
                }
            }
            None => {
                if kind == JoinKind::Left {
                    indices.left.push(idx);
                    indices.right.push(None);
                }
            }
        }
    }
    Ok(indices)
}

/// Name a right-hand column takes in the joined frame.
pub fn joined_name(left: &DataFrame, column: &str, table: &str) -> String {
    if left.column(column).is_ok() {
        format!("{column}_{table}")
    } else {
        column.to_string()
    }
}

/// Builds the joined frame from a row pairing.
///
/// The right key column is dropped. Right columns whose names already exist
/// on the left get the suffix `_<table>`.
pub fn assemble(
    left: &DataFrame,
    right: &DataFrame,
    indices: &JoinIndices,
    right_on: &str,
    table: &str,
) -> Result<DataFrame> {
    let left_rows: Vec<Option<usize>> = indices.left.iter().map(|idx| Some(*idx)).collect();
    let mut columns: Vec<Column> = Vec::with_capacity(left.width() + right.width());
    for column in left.get_columns() {
        columns.push(take_column(column, &left_rows, column.name().as_str())?);
    }
    for column in right.get_columns() {
        let name = column.name().as_str();
        if name == right_on {
            continue;
        }
        let output_name = joined_name(left, name, table);
        columns.push(take_column(column, &indices.right, &output_name)?);
    }
    Ok(DataFrame::new(columns)?)
}

/// Joins `right` onto `left`.
///
/// `table` names the right-hand table in errors and in collision suffixes.
pub fn join_frames(
    left: &DataFrame,
    right: &DataFrame,
    left_on: &str,
    right_on: &str,
    kind: JoinKind,
    table: &str,
) -> Result<DataFrame> {
    require_column(left, "spine", "join key", left_on)?;
    require_column(right, table, "join key", right_on)?;
    let indices = join_indices(left, right, left_on, right_on, kind)?;
    assemble(left, right, &indices, right_on, table)
}
