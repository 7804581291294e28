//! Row-level helpers over polars frames.
//!
//! Relational steps in this crate pick a source row (or none) for every
//! output cell and then gather; these helpers do the reading and gathering.

use hmis_common::{any_to_i64, any_to_key, any_to_timestamp_ms};
use hmis_model::ConfigError;
use polars::prelude::{
    BooleanChunked, Column, DataFrame, DataType, IdxCa, IdxSize, NamedFrom, NewChunkedArray,
    Series, TimeUnit,
};

use crate::error::Result;

/// Fails with [`ConfigError::MissingColumn`] if `column` is not in `df`.
pub fn require_column(df: &DataFrame, table: &str, key: &str, column: &str) -> Result<()> {
    if df.column(column).is_ok() {
        Ok(())
    } else {
        Err(ConfigError::MissingColumn {
            table: table.to_string(),
            key: key.to_string(),
            column: column.to_string(),
        }
        .into())
    }
}

/// Join/group keys for every row. Nulls have no key.
pub fn key_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_key(column.get(idx)?));
    }
    Ok(values)
}

pub fn int_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_i64(column.get(idx)?));
    }
    Ok(values)
}

/// Epoch milliseconds for a datetime column.
pub fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        values.push(any_to_timestamp_ms(column.get(idx)?));
    }
    Ok(values)
}

/// Builds a `Datetime(ms)` series from epoch milliseconds.
pub fn datetime_series(name: &str, values: Vec<Option<i64>>) -> Result<Series> {
    let series = Series::new(name.into(), values);
    Ok(series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

fn index_array(rows: &[Option<usize>]) -> IdxCa {
    IdxCa::from_iter_options(
        "idx".into(),
        rows.iter().map(|row| row.map(|idx| idx as IdxSize)),
    )
}

/// Gathers rows; `None` yields an all-null row.
pub fn take_rows(df: &DataFrame, rows: &[Option<usize>]) -> Result<DataFrame> {
    Ok(df.take(&index_array(rows))?)
}

/// Gathers one column under a new name.
pub fn take_column(column: &Column, rows: &[Option<usize>], name: &str) -> Result<Column> {
    Ok(column.take(&index_array(rows))?.with_name(name.into()))
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::AnyValue;

    fn sample() -> DataFrame {
        DataFrame::new(vec![
            Series::new("id".into(), vec![Some(10i64), None, Some(30)]).into(),
            Series::new("score".into(), vec![1.0f64, 2.5, 3.0]).into(),
        ])
        .unwrap()
    }

    #[test]
    fn keys_skip_nulls_and_unify_numbers() {
        let df = sample();
        assert_eq!(
            key_values(&df, "id").unwrap(),
            vec![Some("10".to_string()), None, Some("30".to_string())]
        );
        assert_eq!(
            key_values(&df, "score").unwrap(),
            vec![Some("1".to_string()), Some("2.5".to_string()), Some("3".to_string())]
        );
    }

    #[test]
    fn take_rows_with_null_index() {
        let df = sample();
        let taken = take_rows(&df, &[Some(2), None, Some(0)]).unwrap();
        assert_eq!(taken.height(), 3);
        assert_eq!(taken.column("id").unwrap().get(0).unwrap(), AnyValue::Int64(30));
        assert_eq!(taken.column("score").unwrap().get(1).unwrap(), AnyValue::Null);
        assert_eq!(taken.column("id").unwrap().get(2).unwrap(), AnyValue::Int64(10));
    }

    #[test]
    fn require_column_names_table() {
        let err = require_column(&sample(), "exit", "destination_column", "dest").unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'dest' named by 'destination_column' is not present in 'exit'"
        );
    }

    #[test]
    fn datetime_round_trip() {
        let series = datetime_series("d", vec![Some(86_400_000), None]).unwrap();
        let df = DataFrame::new(vec![series.into()]).unwrap();
        assert_eq!(
            timestamp_values(&df, "d").unwrap(),
            vec![Some(86_400_000), None]
        );
    }
}
