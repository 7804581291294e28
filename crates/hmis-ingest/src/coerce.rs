//! Turning raw CSV cells into typed columns.
//!
//! Yearly files are stacked first, with the union of their columns; a column
//! missing from one year is null for that year's rows. Declared time columns
//! become `Datetime(ms)`, declared categorical columns become `Int64` codes,
//! and everything else is inferred as `Int64`, then `Float64`, then `String`.

use std::collections::BTreeSet;

use hmis_common::{parse_f64, parse_i64, parse_timestamp_ms};
use hmis_model::CleaningSpec;
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series, TimeUnit};
use tracing::{debug, warn};

use crate::csv_table::CsvTable;
use crate::error::Result;
use crate::report::CleaningReport;

/// Cell spellings read as missing.
const NULL_TOKENS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "NULL", "null", "NaT"];

fn is_null_token(value: &str) -> bool {
    NULL_TOKENS.contains(&value.trim())
}

/// Union of column names across tables, in first-appearance order.
pub fn union_headers(tables: &[CsvTable]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut headers = Vec::new();
    for table in tables {
        for header in &table.headers {
            if seen.insert(header.clone()) {
                headers.push(header.clone());
            }
        }
    }
    headers
}

fn stacked_cells<'a>(tables: &'a [CsvTable], header: &str) -> Vec<Option<&'a str>> {
    let mut cells = Vec::new();
    for table in tables {
        match table.column_index(header) {
            Some(idx) => cells.extend(table.rows.iter().map(|row| {
                let value = row[idx].as_str();
                if is_null_token(value) { None } else { Some(value) }
            })),
            None => cells.extend(std::iter::repeat_n(None, table.rows.len())),
        }
    }
    cells
}

/// Stacks the tables and coerces each column per `spec`.
///
/// Columns in `columns_to_drop` are skipped. Recoded values are counted in
/// `report`.
pub fn build_frame(
    tables: &[CsvTable],
    spec: &CleaningSpec,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let headers = union_headers(tables);
    for name in spec.categorical_var.iter().chain(spec.time_var.iter()) {
        if !headers.contains(name) {
            debug!(table = %report.table, column = %name, "declared column not present");
        }
    }
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for header in &headers {
        if spec.columns_to_drop.contains(header) {
            continue;
        }
        let cells = stacked_cells(tables, header);
        let series = if spec.is_time(header) {
            time_series(header, &cells, report)?
        } else if spec.is_categorical(header) {
            categorical_series(header, &cells, spec, report)
        } else {
            inferred_series(header, &cells)
        };
        columns.push(Column::from(series));
    }
    Ok(DataFrame::new(columns)?)
}

fn time_series(name: &str, cells: &[Option<&str>], report: &mut CleaningReport) -> Result<Series> {
    let mut nulled = 0usize;
    let values: Vec<Option<i64>> = cells
        .iter()
        .map(|cell| {
            let value = (*cell)?;
            let parsed = parse_timestamp_ms(value);
            if parsed.is_none() {
                nulled += 1;
            }
            parsed
        })
        .collect();
    if nulled > 0 {
        warn!(table = %report.table, column = name, count = nulled, "unparseable time values set to null");
        *report
            .time_values_nulled
            .entry(name.to_string())
            .or_default() += nulled;
    }
    let series = Series::new(name.into(), values);
    Ok(series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?)
}

fn categorical_series(
    name: &str,
    cells: &[Option<&str>],
    spec: &CleaningSpec,
    report: &mut CleaningReport,
) -> Series {
    let valid = spec.categorical_valid_values.get(name);
    let mut nulled = 0usize;
    let values: Vec<Option<i64>> = cells
        .iter()
        .map(|cell| {
            let value = (*cell)?;
            let code = parse_i64(value).filter(|code| {
                !spec.categorical_missing_codes.contains(code)
                    && valid.is_none_or(|allowed| allowed.contains(code))
            });
            if code.is_none() {
                nulled += 1;
            }
            code
        })
        .collect();
    if nulled > 0 {
        warn!(table = %report.table, column = name, count = nulled, "categorical codes set to null");
        *report
            .categorical_values_nulled
            .entry(name.to_string())
            .or_default() += nulled;
    }
    Series::new(name.into(), values)
}

fn inferred_series(name: &str, cells: &[Option<&str>]) -> Series {
    let present: Vec<&str> = cells.iter().flatten().copied().collect();
    if present.is_empty() {
        let values: Vec<Option<String>> = vec![None; cells.len()];
        return Series::new(name.into(), values);
    }
    if present.iter().all(|value| parse_i64(value).is_some()) {
        let values: Vec<Option<i64>> = cells.iter().map(|cell| cell.and_then(parse_i64)).collect();
        return Series::new(name.into(), values);
    }
    if present.iter().all(|value| parse_f64(value).is_some()) {
        let values: Vec<Option<f64>> = cells.iter().map(|cell| cell.and_then(parse_f64)).collect();
        return Series::new(name.into(), values);
    }
    let values: Vec<Option<String>> = cells
        .iter()
        .map(|cell| cell.map(str::to_string))
        .collect();
    Series::new(name.into(), values)
}
