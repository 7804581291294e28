//! Collapsing groups of client rows into one row.
//!
//! Most columns take their cell from one of the group's rows (or null), so
//! their collapse is a per-column choice of source row followed by a gather.
//! Time columns are averaged instead.

use std::collections::BTreeSet;

use hmis_common::{MS_PER_DAY, any_to_f64, any_to_key, any_to_timestamp_ms};
use polars::prelude::{Column, DataFrame, DataType};

use crate::error::Result;
use crate::frame_utils::{datetime_series, take_column};

/// How one column reconciles across a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Always the first row's value, even if null.
    Pinned,
    /// First non-null value.
    First,
    /// Largest value; any "yes" wins.
    Boolean,
    /// The shared code, or null when non-null codes disagree.
    NumericCode,
    /// Mean of the values when every value lies within the tolerance, else null.
    Time,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileRules {
    pub pinned: BTreeSet<String>,
    pub boolean: BTreeSet<String>,
    pub numeric_code: BTreeSet<String>,
    pub time: BTreeSet<String>,
    pub tolerance_days: i64,
}

impl ReconcileRules {
    pub fn new(tolerance_days: i64) -> Self {
        Self {
            tolerance_days,
            ..Self::default()
        }
    }

    pub fn rule_for(&self, column: &str) -> FieldRule {
        if self.pinned.contains(column) {
            FieldRule::Pinned
        } else if self.boolean.contains(column) {
            FieldRule::Boolean
        } else if self.numeric_code.contains(column) {
            FieldRule::NumericCode
        } else if self.time.contains(column) {
            FieldRule::Time
        } else {
            FieldRule::First
        }
    }

    fn tolerance_ms(&self) -> i64 {
        self.tolerance_days.saturating_mul(MS_PER_DAY)
    }
}

/// Picks the source row for one column of one group.
///
/// `Time` columns are averaged by [`mean_time`]; here they fall back to the
/// first non-null row.
fn pick_row(column: &Column, rows: &[usize], rule: FieldRule) -> Result<Option<usize>> {
    let Some(&first) = rows.first() else {
        return Ok(None);
    };
    let picked = match rule {
        FieldRule::Pinned => Some(first),
        FieldRule::First | FieldRule::Time => {
            let mut picked = None;
            for &row in rows {
                if !column.get(row)?.is_null() {
                    picked = Some(row);
                    break;
                }
            }
            picked
        }
        FieldRule::Boolean => {
            let mut best: Option<(usize, f64)> = None;
            for &row in rows {
                if let Some(value) = any_to_f64(column.get(row)?)
                    && best.is_none_or(|(_, current)| value > current)
                {
                    best = Some((row, value));
                }
            }
            best.map(|(row, _)| row)
        }
        FieldRule::NumericCode => {
            let mut codes = BTreeSet::new();
            let mut picked = None;
            for &row in rows {
                if let Some(code) = any_to_key(column.get(row)?) {
                    picked.get_or_insert(row);
                    codes.insert(code);
                }
            }
            if codes.len() > 1 { None } else { picked }
        }
    };
    Ok(picked)
}

/// Mean timestamp of a group, or null when the values span more than the
/// tolerance. Null cells are ignored.
pub fn mean_time(column: &Column, rows: &[usize], tolerance_ms: i64) -> Result<Option<i64>> {
    let mut values = Vec::with_capacity(rows.len());
    for &row in rows {
        if let Some(value) = any_to_timestamp_ms(column.get(row)?) {
            values.push(value);
        }
    }
    let (Some(low), Some(high)) = (values.iter().min(), values.iter().max()) else {
        return Ok(None);
    };
    if high - low > tolerance_ms {
        return Ok(None);
    }
    let sum: i128 = values.iter().map(|&value| i128::from(value)).sum();
    let mean = sum / values.len() as i128;
    Ok(i64::try_from(mean).ok())
}

/// Collapses each group of row indices to a single row.
///
/// Groups are emitted in the order given. Column order and dtypes are kept.
pub fn collapse_groups(
    df: &DataFrame,
    groups: &[Vec<usize>],
    rules: &ReconcileRules,
) -> Result<DataFrame> {
    let tolerance_ms = rules.tolerance_ms();
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().as_str();
        let rule = rules.rule_for(name);
        if rule == FieldRule::Time {
            let mut values = Vec::with_capacity(groups.len());
            for group in groups {
                values.push(mean_time(column, group, tolerance_ms)?);
            }
            let series = datetime_series(name, values)?;
            let series = match column.dtype() {
                DataType::Datetime(..) => series.cast(column.dtype())?,
                _ => series,
            };
            columns.push(series.into());
            continue;
        }
        let mut sources = Vec::with_capacity(groups.len());
        for group in groups {
            sources.push(pick_row(column, group, rule)?);
        }
        columns.push(take_column(column, &sources, name)?);
    }
    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{AnyValue, NamedFrom, Series};

    use crate::frame_utils::{datetime_series, int_values, timestamp_values};

    fn day(n: i64) -> i64 {
        n * MS_PER_DAY
    }

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("id".into(), vec![1i64, 1, 1]).into(),
            datetime_series("dob", vec![Some(day(100)), Some(day(102)), None])
                .unwrap()
                .into(),
            Series::new("veteran".into(), vec![Some(0i64), Some(1), None]).into(),
            Series::new("gender".into(), vec![Some(3i64), None, Some(3)]).into(),
            Series::new("race".into(), vec![Some(1i64), Some(2), None]).into(),
            Series::new("note".into(), vec![None, Some("b"), Some("c")]).into(),
        ])
        .unwrap()
    }

    fn rules() -> ReconcileRules {
        let mut rules = ReconcileRules::new(30);
        rules.boolean.insert("veteran".to_string());
        rules.numeric_code.insert("gender".to_string());
        rules.numeric_code.insert("race".to_string());
        rules.time.insert("dob".to_string());
        rules
    }

    #[test]
    fn reconciles_each_rule() {
        let out = collapse_groups(&frame(), &[vec![0, 1, 2]], &rules()).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(timestamp_values(&out, "dob").unwrap(), vec![Some(day(101))]);
        assert_eq!(int_values(&out, "veteran").unwrap(), vec![Some(1)]);
        assert_eq!(int_values(&out, "gender").unwrap(), vec![Some(3)]);
        assert_eq!(int_values(&out, "race").unwrap(), vec![None]);
        assert_eq!(
            out.column("note").unwrap().get(0).unwrap(),
            AnyValue::String("b")
        );
    }

    #[test]
    fn times_outside_tolerance_become_null() {
        let mut rules = rules();
        rules.tolerance_days = 1;
        let out = collapse_groups(&frame(), &[vec![0, 1]], &rules).unwrap();
        assert_eq!(timestamp_values(&out, "dob").unwrap(), vec![None]);
    }

    #[test]
    fn time_mean_ignores_nulls_and_keeps_dtype() {
        let df = frame();
        let dob = df.column("dob").unwrap();
        assert_eq!(mean_time(dob, &[0, 1, 2], 0).unwrap(), None);
        assert_eq!(mean_time(dob, &[1, 2], 0).unwrap(), Some(day(102)));
        assert_eq!(mean_time(dob, &[2], 30 * MS_PER_DAY).unwrap(), None);
        let out = collapse_groups(&df, &[vec![0, 1]], &rules()).unwrap();
        assert_eq!(out.column("dob").unwrap().dtype(), dob.dtype());
    }

    #[test]
    fn pinned_columns_keep_first_row() {
        let mut rules = rules();
        rules.pinned.insert("note".to_string());
        let out = collapse_groups(&frame(), &[vec![0, 2], vec![1]], &rules).unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(out.column("note").unwrap().get(0).unwrap(), AnyValue::Null);
        assert_eq!(
            out.column("note").unwrap().get(1).unwrap(),
            AnyValue::String("b")
        );
    }
}
