//! Client records: placeholder exclusion and identity resolution.
//!
//! Rows sharing a person ID and identical name fields are candidate
//! duplicates. Visiting rows in year-then-row order, a row whose date of
//! birth lies within the tolerance of an identity already resolved for its
//! candidate group joins that identity; otherwise it starts a new one. Two
//! missing DOBs match each other, but a missing DOB never matches a known one.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use hmis_common::{MS_PER_DAY, any_to_string};
use hmis_ingest::{CleaningReport, TableSource};
use hmis_model::{ClientMetadata, MetadataDocument, TableMetadata};
use polars::prelude::DataFrame;
use tracing::{debug, info_span};

use super::{SourceArgs, load};
use crate::error::Result;
use crate::frame_utils::{filter_rows, key_values, timestamp_values};
use crate::reconcile::{ReconcileRules, collapse_groups};

/// A cleaned client table.
#[derive(Debug, Clone)]
pub struct ClientTable {
    pub frame: DataFrame,
    pub report: CleaningReport,
    /// Person IDs whose every record was a placeholder and was excluded.
    pub excluded_persons: HashSet<String>,
}

/// Loads clients and resolves duplicate identities.
///
/// An explicit `dob_tolerance_days` overrides the metadata document.
pub fn get_client(
    source: &TableSource,
    data_dir: Option<&Path>,
    paths: Option<&[String]>,
    metadata: &MetadataDocument,
    name_exclusion: bool,
    dob_tolerance_days: Option<i64>,
) -> Result<DataFrame> {
    clean_client(
        SourceArgs::new(source, data_dir, paths),
        metadata,
        name_exclusion,
        dob_tolerance_days,
    )
    .map(|table| table.frame)
}

pub fn clean_client(
    args: SourceArgs<'_>,
    metadata: &MetadataDocument,
    name_exclusion: bool,
    dob_tolerance_days: Option<i64>,
) -> Result<ClientTable> {
    let meta = ClientMetadata::from_document(metadata)?;
    let tolerance_days = meta.tolerance_days(dob_tolerance_days);
    let span = info_span!("client", table = metadata.table(), tolerance_days);
    let _guard = span.enter();

    let mut cleaning = meta.cleaning.clone();
    if !cleaning.is_time(&meta.dob_column) {
        cleaning.time_var.push(meta.dob_column.clone());
    }
    let mut required = vec![
        ("person_ID", meta.person_id.as_str()),
        ("dob_column", meta.dob_column.as_str()),
    ];
    required.extend(meta.name_columns.iter().map(|name| ("name_columns", name.as_str())));
    let (mut df, mut report) = load(args, &cleaning, metadata.table(), &required)?;

    let mut excluded_persons = HashSet::new();
    if name_exclusion {
        let (kept, excluded) = exclude_placeholders(&df, &meta)?;
        debug!(
            removed = df.height() - kept.height(),
            persons = excluded.len(),
            "excluded placeholder names"
        );
        df = kept;
        excluded_persons = excluded;
    }

    let identities = resolve_identities(&df, &meta, tolerance_days)?;
    let mut rules = ReconcileRules::new(tolerance_days);
    rules.pinned.insert(meta.dob_column.clone());
    rules.boolean.extend(meta.boolean.iter().cloned());
    rules.numeric_code.extend(meta.numeric_code.iter().cloned());
    rules.time.extend(
        cleaning
            .time_var
            .iter()
            .filter(|name| **name != meta.dob_column)
            .cloned(),
    );
    let before = df.height();
    let frame = collapse_groups(&df, &identities, &rules)?;
    debug!(
        rows = before,
        identities = frame.height(),
        "resolved client identities"
    );
    report.rows_kept = frame.height();
    Ok(ClientTable {
        frame,
        report,
        excluded_persons,
    })
}

/// A row is a placeholder when every name field holds the placeholder,
/// ignoring case and surrounding whitespace.
fn is_placeholder(df: &DataFrame, meta: &ClientMetadata, row: usize) -> Result<bool> {
    if meta.name_columns.is_empty() {
        return Ok(false);
    }
    for name in &meta.name_columns {
        let value = any_to_string(df.column(name)?.get(row)?);
        if !value.trim().eq_ignore_ascii_case(&meta.name_placeholder) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Drops placeholder rows and reports persons left with no real record.
fn exclude_placeholders(
    df: &DataFrame,
    meta: &ClientMetadata,
) -> Result<(DataFrame, HashSet<String>)> {
    let persons = key_values(df, &meta.person_id)?;
    let mut keep = Vec::with_capacity(df.height());
    let mut placeholder_persons = HashSet::new();
    let mut real_persons = HashSet::new();
    for (row, person) in persons.into_iter().enumerate() {
        let placeholder = is_placeholder(df, meta, row)?;
        keep.push(!placeholder);
        if let Some(person) = person {
            if placeholder {
                placeholder_persons.insert(person);
            } else {
                real_persons.insert(person);
            }
        }
    }
    let excluded = placeholder_persons
        .difference(&real_persons)
        .cloned()
        .collect();
    Ok((filter_rows(df, &keep)?, excluded))
}

struct Identity {
    dob: Option<i64>,
    rows: Vec<usize>,
}

fn within(left: Option<i64>, right: Option<i64>, tolerance_ms: i64) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(a), Some(b)) => (a - b).abs() <= tolerance_ms,
        _ => false,
    }
}

/// Groups row indices into identities, in order of first appearance.
pub fn resolve_identities(
    df: &DataFrame,
    meta: &ClientMetadata,
    tolerance_days: i64,
) -> Result<Vec<Vec<usize>>> {
    let tolerance_ms = tolerance_days.saturating_mul(MS_PER_DAY);
    let mut key_columns = vec![key_values(df, &meta.person_id)?];
    for name in &meta.name_columns {
        key_columns.push(key_values(df, name)?);
    }
    let dobs = timestamp_values(df, &meta.dob_column)?;

    let mut candidates: HashMap<Vec<Option<String>>, Vec<Identity>> = HashMap::new();
    for (row, dob) in dobs.iter().copied().enumerate() {
        let key: Vec<Option<String>> = key_columns.iter().map(|c| c[row].clone()).collect();
        let identities = candidates.entry(key).or_default();
        match identities
            .iter_mut()
            .find(|identity| within(identity.dob, dob, tolerance_ms))
        {
            Some(identity) => identity.rows.push(row),
            None => identities.push(Identity {
                dob,
                rows: vec![row],
            }),
        }
    }
    let mut groups: Vec<Vec<usize>> = candidates
        .into_values()
        .flatten()
        .map(|identity| identity.rows)
        .collect();
    groups.sort_by_key(|rows| rows[0]);
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmis_model::CleaningSpec;
    use polars::prelude::{NamedFrom, Series};

    use crate::frame_utils::datetime_series;

    fn meta() -> ClientMetadata {
        ClientMetadata {
            cleaning: CleaningSpec::new(["pid", "first_name", "dob"]).with_time(["dob"]),
            person_id: "pid".to_string(),
            dob_column: "dob".to_string(),
            name_columns: vec!["first_name".to_string()],
            boolean: Vec::new(),
            numeric_code: Vec::new(),
            name_placeholder: "noname".to_string(),
            dob_tolerance_days: None,
        }
    }

    fn frame(pids: &[i64], names: &[&str], dobs: Vec<Option<i64>>) -> DataFrame {
        DataFrame::new(vec![
            Series::new("pid".into(), pids.to_vec()).into(),
            Series::new("first_name".into(), names.to_vec()).into(),
            datetime_series("dob", dobs).unwrap().into(),
        ])
        .unwrap()
    }

    fn day(n: i64) -> Option<i64> {
        Some(n * MS_PER_DAY)
    }

    #[test]
    fn close_birth_dates_are_one_identity() {
        let df = frame(&[4, 4], &["Ann", "Ann"], vec![day(100), day(102)]);
        let groups = resolve_identities(&df, &meta(), 30).unwrap();
        assert_eq!(groups, vec![vec![0, 1]]);
    }

    #[test]
    fn distant_birth_dates_split() {
        let df = frame(&[3, 3], &["Bo", "Bo"], vec![day(0), day(30 * 365)]);
        let groups = resolve_identities(&df, &meta(), 30).unwrap();
        assert_eq!(groups, vec![vec![0], vec![1]]);
    }

    #[test]
    fn missing_birth_date_only_matches_missing() {
        let df = frame(
            &[1, 1, 1],
            &["Cy", "Cy", "Cy"],
            vec![None, day(5), None],
        );
        let groups = resolve_identities(&df, &meta(), 30).unwrap();
        assert_eq!(groups, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn different_names_never_merge() {
        let df = frame(&[1, 1], &["Di", "Ed"], vec![day(1), day(1)]);
        let groups = resolve_identities(&df, &meta(), 30).unwrap();
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn placeholder_only_persons_are_reported() {
        let df = frame(
            &[1, 2, 2, 3],
            &["Ann", "NoName", "Bea", "noname"],
            vec![day(1), day(2), day(2), day(3)],
        );
        let (kept, excluded) = exclude_placeholders(&df, &meta()).unwrap();
        assert_eq!(kept.height(), 2);
        assert_eq!(excluded, HashSet::from(["3".to_string()]));
    }

    #[test]
    fn placeholder_needs_every_name_field() {
        let mut meta = meta();
        meta.name_columns.push("last_name".to_string());
        let mut df = frame(&[1, 2], &["noname", "noname"], vec![day(1), day(2)]);
        df.with_column(Series::new("last_name".into(), vec!["Lee", "NONAME"]))
            .unwrap();
        assert!(!is_placeholder(&df, &meta, 0).unwrap());
        assert!(is_placeholder(&df, &meta, 1).unwrap());
    }
}
