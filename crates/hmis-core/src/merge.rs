//! The merge orchestrator.
//!
//! Every cleaned table is joined onto the enrollment spine in a fixed order.
//! Each join is left-preserving and is checked to keep exactly one row per
//! spine enrollment. Child tables keep their last row per join key.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use hmis_ingest::{CleaningReport, TableSource, dedupe_frame_by_keys, load_metadata};
use hmis_model::{
    ClientMetadata, ConfigError, DestinationMap, EnrollmentMetadata, EntryExitMetadata,
    ExitMetadata, MergeOptions, MetadataDocument, ProjectMetadata, TableKind, TableMetadata,
};
use polars::prelude::DataFrame;
use tracing::{debug, info, info_span, warn};

use crate::entities::{
    ClientTable, SourceArgs, clean_client, clean_disabilities, clean_enrollment, clean_entry_exit_table,
    clean_exit, clean_income, clean_project,
};
use crate::error::{CoreError, Result};
use crate::frame_utils::{
    datetime_series, filter_rows, key_values, require_column, timestamp_values,
};
use crate::join::{JoinKind, assemble, join_frames, join_indices, joined_name};
use crate::reconcile::{ReconcileRules, collapse_groups};

/// Metadata document path for each table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFiles {
    files: BTreeMap<TableKind, PathBuf>,
}

impl MetaFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: TableKind, path: impl Into<PathBuf>) {
        self.files.insert(kind, path.into());
    }

    pub fn with(mut self, kind: TableKind, path: impl Into<PathBuf>) -> Self {
        self.insert(kind, path);
        self
    }

    pub fn get(&self, kind: TableKind) -> Option<&Path> {
        self.files.get(&kind).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TableKind, &Path)> {
        self.files.iter().map(|(kind, path)| (*kind, path.as_path()))
    }

    /// Fails naming every table without a metadata file.
    pub fn check_complete(&self) -> std::result::Result<(), ConfigError> {
        let missing: Vec<String> = TableKind::ALL
            .iter()
            .filter(|kind| !self.files.contains_key(kind))
            .map(|kind| kind.as_str().to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys {
                table: "meta_files".to_string(),
                keys: missing,
            })
        }
    }
}

impl FromIterator<(TableKind, PathBuf)> for MetaFiles {
    fn from_iter<I: IntoIterator<Item = (TableKind, PathBuf)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

/// The merged table plus what each cleaner reported.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub frame: DataFrame,
    /// One report per table, in merge order.
    pub reports: Vec<CleaningReport>,
    /// Enrollments removed because their person only had placeholder names.
    pub excluded_enrollments: usize,
}

/// Builds the merged analytic table: one row per spine enrollment.
pub fn merge_tables(
    meta_files: &MetaFiles,
    data_dir: &Path,
    paths: &[String],
    options: &MergeOptions,
    destinations: &DestinationMap,
) -> Result<DataFrame> {
    merge_tables_with_report(meta_files, data_dir, paths, options, destinations)
        .map(|output| output.frame)
}

struct Documents(BTreeMap<TableKind, MetadataDocument>);

impl Documents {
    /// Loads and validates every document before any data file is opened.
    fn load(meta_files: &MetaFiles) -> Result<Self> {
        meta_files.check_complete()?;
        let mut documents = BTreeMap::new();
        for (kind, path) in meta_files.iter() {
            let document = load_metadata(path, kind.as_str())?;
            document.require(kind.required_keys())?;
            documents.insert(kind, document);
        }
        Ok(Self(documents))
    }

    fn get(&self, kind: TableKind) -> Result<&MetadataDocument> {
        self.0.get(&kind).ok_or_else(|| {
            CoreError::from(ConfigError::MissingKeys {
                table: "meta_files".to_string(),
                keys: vec![kind.as_str().to_string()],
            })
        })
    }
}

pub fn merge_tables_with_report(
    meta_files: &MetaFiles,
    data_dir: &Path,
    paths: &[String],
    options: &MergeOptions,
    destinations: &DestinationMap,
) -> Result<MergeOutput> {
    let span = info_span!("merge", data_dir = %data_dir.display(), years = paths.len());
    let _guard = span.enter();

    let documents = Documents::load(meta_files)?;
    let enrollment_meta = EnrollmentMetadata::from_document(documents.get(TableKind::Enrollment)?)?;
    let client_meta = ClientMetadata::from_document(documents.get(TableKind::Client)?)?;
    let project_meta = ProjectMetadata::from_document(documents.get(TableKind::Project)?)?;
    let min_dob_ms = min_dob_timestamp(options.min_dob_year)?;

    let sources: BTreeMap<TableKind, TableSource> = TableKind::ALL
        .iter()
        .map(|kind| (*kind, TableSource::file_name(kind.file_name())))
        .collect();
    let args = |kind: TableKind| source_args(&sources, kind, data_dir, paths);
    let mut reports = Vec::with_capacity(TableKind::ALL.len());

    let (mut spine, report) = clean_enrollment(
        args(TableKind::Enrollment)?,
        documents.get(TableKind::Enrollment)?,
        options.groups,
    )?;
    reports.push(report);

    let (exits, mut exit_report) = clean_exit(
        args(TableKind::Exit)?,
        documents.get(TableKind::Exit)?,
        destinations,
    )?;

    let ClientTable {
        frame: clients,
        report: mut client_report,
        excluded_persons,
    } = clean_client(
        args(TableKind::Client)?,
        documents.get(TableKind::Client)?,
        options.name_exclusion,
        Some(options.dob_tolerance_days),
    )?;

    let mut excluded_enrollments = 0;
    if options.name_exclusion && !excluded_persons.is_empty() {
        let keep: Vec<bool> = key_values(&spine, &enrollment_meta.person_id)?
            .into_iter()
            .map(|person| {
                person.is_none_or(|person| !excluded_persons.contains(&person))
            })
            .collect();
        let kept = filter_rows(&spine, &keep)?;
        excluded_enrollments = spine.height() - kept.height();
        debug!(
            removed = excluded_enrollments,
            "removed enrollments of placeholder-only persons"
        );
        spine = kept;
    }
    let expected = spine.height();
    info!(enrollments = expected, "built enrollment spine");

    let ppid = enrollment_meta.person_enrollment_id.as_str();
    let exit_ppid = exit_id(documents.get(TableKind::Exit)?)?;
    let mut merged = checked_join(
        &spine,
        &exits,
        (ppid, exit_ppid.as_str()),
        TableKind::Exit.as_str(),
        expected,
        &mut exit_report,
    )?;
    reports.push(exit_report);

    merged = join_client(
        &merged,
        &clients,
        &enrollment_meta,
        &client_meta,
        options,
        min_dob_ms,
        &mut client_report,
    )?;
    ensure_rows(TableKind::Client.as_str(), expected, merged.height())?;
    reports.push(client_report);

    for kind in [
        TableKind::Disabilities,
        TableKind::EmploymentEducation,
        TableKind::HealthDv,
        TableKind::Income,
    ] {
        let document = documents.get(kind)?;
        let (table, mut report) = match kind {
            TableKind::Disabilities => clean_disabilities(args(kind)?, document)?,
            TableKind::Income => clean_income(args(kind)?, document)?,
            _ => clean_entry_exit_table(args(kind)?, document)?,
        };
        let right_on = person_enrollment_id(document)?;
        merged = checked_join(
            &merged,
            &table,
            (ppid, right_on.as_str()),
            kind.as_str(),
            expected,
            &mut report,
        )?;
        reports.push(report);
    }

    let (projects, mut report) = clean_project(
        args(TableKind::Project)?,
        documents.get(TableKind::Project)?,
    )?;
    merged = checked_join(
        &merged,
        &projects,
        (enrollment_meta.program_id.as_str(), project_meta.program_id.as_str()),
        TableKind::Project.as_str(),
        expected,
        &mut report,
    )?;
    reports.push(report);

    info!(
        rows = merged.height(),
        columns = merged.width(),
        "merged tables"
    );
    Ok(MergeOutput {
        frame: merged,
        reports,
        excluded_enrollments,
    })
}

fn source_args<'a>(
    sources: &'a BTreeMap<TableKind, TableSource>,
    kind: TableKind,
    data_dir: &'a Path,
    paths: &'a [String],
) -> Result<SourceArgs<'a>> {
    let source = sources.get(&kind).ok_or_else(|| ConfigError::UnknownTable {
        name: kind.as_str().to_string(),
    })?;
    Ok(SourceArgs::new(source, Some(data_dir), Some(paths)))
}

fn exit_id(document: &MetadataDocument) -> Result<String> {
    Ok(ExitMetadata::from_document(document)?.person_enrollment_id)
}

/// The enrollment ID column of a stage-indexed table.
fn person_enrollment_id(document: &MetadataDocument) -> Result<String> {
    Ok(EntryExitMetadata::from_document(document)?.person_enrollment_id)
}

fn ensure_rows(table: &str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(CoreError::Cardinality {
            table: table.to_string(),
            expected,
            actual,
        })
    }
}

/// Keeps the last row per join key so a child table joins one-to-one.
fn last_row_per_key(
    right: &DataFrame,
    right_on: &str,
    table: &str,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    require_column(right, table, "join key", right_on)?;
    let (reduced, dropped) = dedupe_frame_by_keys(right, &[right_on.to_string()], None)?;
    if dropped > 0 {
        warn!(table, dropped, key = right_on, "dropped repeated join keys");
        report.rows_kept = report.rows_kept.saturating_sub(dropped);
        report.add_warning(format!(
            "{dropped} row(s) repeating a '{right_on}' value replaced by the last one"
        ));
    }
    Ok(reduced)
}

fn checked_join(
    left: &DataFrame,
    right: &DataFrame,
    (left_on, right_on): (&str, &str),
    table: &str,
    expected: usize,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let span = info_span!("join", table);
    let _guard = span.enter();
    let right = last_row_per_key(right, right_on, table, report)?;
    let joined = join_frames(left, &right, left_on, right_on, JoinKind::Left, table)?;
    ensure_rows(table, expected, joined.height())?;
    debug!(
        rows = joined.height(),
        columns = joined.width(),
        "joined table"
    );
    Ok(joined)
}

fn min_dob_timestamp(year: i32) -> Result<i64> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| datetime.and_utc().timestamp_millis())
        .ok_or_else(|| {
            ConfigError::InvalidMetadata {
                table: "options".to_string(),
                reason: format!("min_dob_year {year} is not a valid year"),
            }
            .into()
        })
}

/// Joins clients by person, nulls implausible DOBs and collapses the
/// client matches back to one row per enrollment.
fn join_client(
    left: &DataFrame,
    clients: &DataFrame,
    enrollment: &EnrollmentMetadata,
    client: &ClientMetadata,
    options: &MergeOptions,
    min_dob_ms: i64,
    report: &mut CleaningReport,
) -> Result<DataFrame> {
    let table = TableKind::Client.as_str();
    let span = info_span!("join", table);
    let _guard = span.enter();

    require_column(left, "spine", "join key", &enrollment.person_id)?;
    require_column(clients, table, "join key", &client.person_id)?;
    let rename = |column: &str| joined_name(left, column, table);
    let dob = rename(client.dob_column.as_str());
    let indices = join_indices(left, clients, &enrollment.person_id, &client.person_id, JoinKind::Left)?;
    let mut joined = assemble(left, clients, &indices, &client.person_id, table)?;

    let entries = timestamp_values(&joined, &enrollment.entry_date)?;
    let mut implausible = 0usize;
    let dobs: Vec<Option<i64>> = timestamp_values(&joined, &dob)?
        .into_iter()
        .zip(&entries)
        .map(|(dob, entry)| match dob {
            Some(value) if value < min_dob_ms || entry.is_some_and(|entry| value > entry) => {
                implausible += 1;
                None
            }
            other => other,
        })
        .collect();
    if implausible > 0 {
        warn!(count = implausible, column = %dob, "nulled implausible dates of birth");
        report.add_warning(format!(
            "{implausible} implausible date(s) of birth nulled in the merge"
        ));
    }
    joined.with_column(datetime_series(&dob, dobs)?)?;

    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(left.height());
    for (row, left_row) in indices.left.iter().enumerate() {
        match groups.last_mut() {
            Some(group) if indices.left[group[0]] == *left_row => group.push(row),
            _ => groups.push(vec![row]),
        }
    }
    let mut rules = ReconcileRules::new(options.dob_tolerance_days);
    rules.boolean.extend(client.boolean.iter().map(|column| rename(column.as_str())));
    rules.numeric_code.extend(client.numeric_code.iter().map(|column| rename(column.as_str())));
    rules.time.insert(dob.clone());
    rules.time.extend(
        client
            .cleaning
            .time_var
            .iter()
            .filter(|column| **column != client.dob_column && **column != client.person_id)
            .map(|column| rename(column.as_str())),
    );
    let collapsed = collapse_groups(&joined, &groups, &rules)?;
    debug!(
        matches = joined.height(),
        rows = collapsed.height(),
        "collapsed client matches per enrollment"
    );
    Ok(collapsed)
}
