use std::collections::HashMap;

use hmis_common::{any_to_f64, any_to_key};
use polars::prelude::{BooleanChunked, Column, DataFrame, NewChunkedArray};

use crate::error::Result;

/// Drops rows sharing the same values in `keys`.
///
/// Nulls compare equal inside a key. Within each group the row with the
/// highest `tiebreak` value survives; ties, or no tiebreak column, keep the
/// last row seen. Survivors keep their original relative order. Returns the
/// filtered frame and the number of rows dropped.
pub fn dedupe_frame_by_keys(
    df: &DataFrame,
    keys: &[String],
    tiebreak: Option<&str>,
) -> Result<(DataFrame, usize)> {
    if df.height() == 0 || keys.is_empty() {
        return Ok((df.clone(), 0));
    }
    let key_columns: Vec<&Column> = keys
        .iter()
        .map(|key| df.column(key))
        .collect::<std::result::Result<_, _>>()?;
    let tiebreak_column = tiebreak.map(|name| df.column(name)).transpose()?;

    // key -> (row index, tiebreak value)
    let mut winners: HashMap<Vec<Option<String>>, (usize, Option<f64>)> = HashMap::new();
    for idx in 0..df.height() {
        let mut composite = Vec::with_capacity(key_columns.len());
        for column in &key_columns {
            composite.push(any_to_key(column.get(idx)?));
        }
        let rank = match tiebreak_column {
            Some(column) => any_to_f64(column.get(idx)?),
            None => None,
        };
        match winners.get_mut(&composite) {
            Some(current) => {
                if !beats(current.1, rank) {
                    *current = (idx, rank);
                }
            }
            None => {
                winners.insert(composite, (idx, rank));
            }
        }
    }

    let mut keep = vec![false; df.height()];
    for (idx, _) in winners.values() {
        keep[*idx] = true;
    }
    let dropped = df.height() - winners.len();
    if dropped == 0 {
        return Ok((df.clone(), 0));
    }
    let mask = BooleanChunked::from_slice("dedupe".into(), &keep);
    Ok((df.filter(&mask)?, dropped))
}

/// True when the incumbent rank strictly beats the challenger. Null ranks lowest.
fn beats(incumbent: Option<f64>, challenger: Option<f64>) -> bool {
    match (incumbent, challenger) {
        (Some(current), Some(candidate)) => current > candidate,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::{AnyValue, NamedFrom, Series};

    fn frame(ids: &[Option<i64>], values: &[i64]) -> DataFrame {
        DataFrame::new(vec![
            Series::new("id".into(), ids.to_vec()).into(),
            Series::new("value".into(), values.to_vec()).into(),
        ])
        .unwrap()
    }

    fn values(df: &DataFrame) -> Vec<i64> {
        (0..df.height())
            .map(|idx| match df.column("value").unwrap().get(idx).unwrap() {
                AnyValue::Int64(v) => v,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn keeps_last_row_in_original_order() {
        let df = frame(&[Some(1), Some(2), Some(1), Some(3)], &[10, 20, 30, 40]);
        let (deduped, dropped) = dedupe_frame_by_keys(&df, &["id".to_string()], None).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(values(&deduped), vec![20, 30, 40]);
    }

    #[test]
    fn null_keys_compare_equal() {
        let df = frame(&[None, Some(1), None], &[1, 2, 3]);
        let (deduped, dropped) = dedupe_frame_by_keys(&df, &["id".to_string()], None).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(values(&deduped), vec![2, 3]);
    }

    #[test]
    fn tiebreak_prefers_highest_value() {
        let df = frame(&[Some(1), Some(1), Some(1)], &[5, 9, 2]);
        let (deduped, _) =
            dedupe_frame_by_keys(&df, &["id".to_string()], Some("value")).unwrap();
        assert_eq!(values(&deduped), vec![9]);
    }

    #[test]
    fn tiebreak_ties_keep_last() {
        let df = DataFrame::new(vec![
            Series::new("id".into(), vec![1i64, 1, 1]).into(),
            Series::new("rank".into(), vec![Some(3i64), Some(3), None]).into(),
            Series::new("value".into(), vec![1i64, 2, 3]).into(),
        ])
        .unwrap();
        let (deduped, dropped) =
            dedupe_frame_by_keys(&df, &["id".to_string()], Some("rank")).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(values(&deduped), vec![2]);
    }

    #[test]
    fn missing_key_column_is_error() {
        let df = frame(&[Some(1)], &[1]);
        assert!(dedupe_frame_by_keys(&df, &["absent".to_string()], None).is_err());
    }
}
