use std::fs;
use std::path::PathBuf;

use hmis_common::any_to_string;
use hmis_core::{CoreError, MetaFiles, merge_tables, merge_tables_with_report};
use hmis_ingest::{default_destination_path, load_destination_map};
use hmis_model::{ConfigError, DestinationMap, MergeOptions, TableKind};
use polars::prelude::DataFrame;
use serde_json::{Value, json};
use tempfile::TempDir;

const YEAR: &str = "2011";

struct Fixture {
    dir: TempDir,
    meta_files: MetaFiles,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(YEAR)).unwrap();
        let mut fixture = Self {
            dir,
            meta_files: MetaFiles::new(),
        };
        for (kind, csv, metadata) in default_tables() {
            fixture.write_csv(kind, csv);
            fixture.write_meta(kind, metadata);
        }
        fixture
    }

    fn year_dir(&self) -> PathBuf {
        self.dir.path().join(YEAR)
    }

    fn write_csv(&self, kind: TableKind, contents: &str) {
        fs::write(self.year_dir().join(kind.file_name()), contents).unwrap();
    }

    fn write_meta(&mut self, kind: TableKind, metadata: Value) {
        let path = self.dir.path().join(format!("{}.json", kind.as_str()));
        fs::write(&path, serde_json::to_string_pretty(&metadata).unwrap()).unwrap();
        self.meta_files.insert(kind, path);
    }

    fn merge(&self, options: &MergeOptions) -> Result<DataFrame, CoreError> {
        merge_tables(
            &self.meta_files,
            self.dir.path(),
            &[YEAR.to_string()],
            options,
            &destinations(),
        )
    }
}

fn destinations() -> DestinationMap {
    load_destination_map(&default_destination_path()).unwrap()
}

fn stage_keys() -> Value {
    json!({
        "collection_stage_column": "stage",
        "entry_stage_val": 0,
        "exit_stage_val": 1,
        "update_stage_val": 2,
        "annual_assessment_stage_val": 5,
        "post_exit_stage_val": 6,
    })
}

fn with_stages(mut metadata: Value) -> Value {
    if let (Some(target), Value::Object(stages)) = (metadata.as_object_mut(), stage_keys()) {
        target.extend(stages);
    }
    metadata
}

fn default_tables() -> Vec<(TableKind, &'static str, Value)> {
    vec![
        (
            TableKind::Enrollment,
            "personID,person_enrollID,programID,groupID,entrydate\n\
             1,10,100,1000,2011-01-13\n\
             2,20,200,2000,2011-06-10\n\
             3,30,200,3000,2011-12-05\n\
             4,40,100,4000,2011-09-10\n",
            json!({
                "name": "enrollment",
                "person_enrollment_ID": "person_enrollID",
                "person_ID": "personID",
                "program_ID": "programID",
                "groupID_column": "groupID",
                "duplicate_check_columns": ["personID", "person_enrollID", "programID", "groupID"],
                "columns_to_drop": [],
                "time_var": ["entrydate"],
                "entry_date": "entrydate",
            }),
        ),
        (
            TableKind::Exit,
            "ppid,dest_num,exitdate\n\
             10,12,2011-08-01\n\
             20,27,2011-12-21\n\
             30,20,2011-12-27\n\
             40,10,2011-11-30\n",
            json!({
                "name": "exit",
                "person_enrollment_ID": "ppid",
                "destination_column": "dest_num",
                "duplicate_check_columns": ["ppid"],
                "time_var": ["exitdate"],
            }),
        ),
        (
            TableKind::Client,
            "pid,dob,gender,veteran,first_name\n\
             1,1990-03-13,0,0,AAA\n\
             1,2012-04-16,0,0,AAA\n\
             2,1955-08-21,1,1,noname\n\
             2,1855-08-21,1,1,noname\n\
             3,2001-02-16,1,0,CCC\n\
             3,2003-02-16,1,0,CCC\n\
             4,1983-04-04,0,0,DDD\n\
             4,1983-04-06,0,0,DDD\n",
            json!({
                "name": "client",
                "person_ID": "pid",
                "dob_column": "dob",
                "time_var": ["dob"],
                "categorical_var": ["gender", "veteran"],
                "boolean": ["veteran"],
                "numeric_code": ["gender"],
                "duplicate_check_columns": ["pid", "dob"],
                "name_columns": ["first_name"],
            }),
        ),
        (
            TableKind::Disabilities,
            "person_enrollID,stage,type,response\n\
             10,0,5,0\n10,1,5,0\n20,0,5,1\n20,1,5,1\n\
             30,0,5,0\n30,1,5,0\n40,0,5,0\n40,1,5,1\n",
            with_stages(json!({
                "name": "disabilities",
                "person_enrollment_ID": "person_enrollID",
                "categorical_var": ["response"],
                "type_column": "type",
                "response_column": "response",
                "duplicate_check_columns": ["person_enrollID", "stage", "type"],
            })),
        ),
        (
            TableKind::EmploymentEducation,
            "ppid,stage,employed\n\
             10,0,0\n10,1,0\n20,0,0\n20,1,1\n30,0,1\n30,1,1\n40,0,0\n40,1,1\n",
            with_stages(json!({
                "name": "employment_education",
                "person_enrollment_ID": "ppid",
                "categorical_var": ["employed"],
                "duplicate_check_columns": ["ppid", "stage"],
            })),
        ),
        (
            TableKind::HealthDv,
            "ppid,stage,health_status\n\
             10,0,0\n10,1,0\n20,0,0\n20,1,1\n30,0,1\n30,1,1\n40,0,0\n40,1,1\n",
            with_stages(json!({
                "name": "health_dv",
                "person_enrollment_ID": "ppid",
                "categorical_var": ["health_status"],
                "duplicate_check_columns": ["ppid", "stage"],
            })),
        ),
        (
            TableKind::Income,
            "ppid,stage,income\n\
             10,0,0\n10,1,0\n20,0,0\n20,1,1000\n30,0,500\n30,1,400\n40,0,0\n40,1,300\n",
            with_stages(json!({
                "name": "income",
                "person_enrollment_ID": "ppid",
                "categorical_var": ["income"],
                "columns_to_take_max": ["income"],
                "duplicate_check_columns": ["ppid", "stage"],
            })),
        ),
        (
            TableKind::Project,
            "pr_id,type\n100,1\n200,2\n",
            json!({
                "name": "project",
                "program_ID": "pr_id",
                "project_type_column": "type",
                "duplicate_check_columns": ["pr_id"],
            }),
        ),
    ]
}

fn cells(df: &DataFrame, name: &str) -> Vec<String> {
    let column = df.column(name).unwrap();
    (0..df.height())
        .map(|idx| any_to_string(column.get(idx).unwrap()))
        .collect()
}

fn no_groups() -> MergeOptions {
    MergeOptions::default().with_groups(false)
}

#[test]
fn merges_every_table_onto_the_enrollment_spine() {
    let fixture = Fixture::new();
    let df = fixture.merge(&no_groups()).unwrap();

    assert_eq!(df.height(), 4);
    assert_eq!(cells(&df, "person_enrollID"), ["10", "20", "30", "40"]);
    assert_eq!(cells(&df, "first_name"), ["AAA", "noname", "CCC", "DDD"]);
    assert_eq!(cells(&df, "DestinationNumeric"), ["12", "27", "20", "10"]);
    assert_eq!(
        cells(&df, "DestinationGroup"),
        ["Temporary", "Temporary", "Permanent", "Permanent"]
    );
    assert_eq!(
        cells(&df, "DestinationSuccess"),
        ["Other Exit", "Other Exit", "Successful Exit", "Successful Exit"]
    );
    assert_eq!(cells(&df, "Subsidy"), ["false", "false", "true", "false"]);
    assert_eq!(
        cells(&df, "exitdate"),
        [
            "2011-08-01 00:00:00",
            "2011-12-21 00:00:00",
            "2011-12-27 00:00:00",
            "2011-11-30 00:00:00",
        ]
    );
    assert_eq!(
        cells(&df, "dob"),
        [
            "1990-03-13 00:00:00",
            "1955-08-21 00:00:00",
            "",
            "1983-04-04 00:00:00",
        ]
    );
    assert_eq!(cells(&df, "gender"), ["0", "1", "1", "0"]);
    assert_eq!(cells(&df, "veteran"), ["0", "1", "0", "0"]);
    assert_eq!(cells(&df, "Physical_entry"), ["0", "1", "0", "0"]);
    assert_eq!(cells(&df, "Physical_exit"), ["0", "1", "0", "1"]);
    assert_eq!(cells(&df, "employed_entry"), ["0", "0", "1", "0"]);
    assert_eq!(cells(&df, "employed_exit"), ["0", "1", "1", "1"]);
    assert_eq!(cells(&df, "health_status_entry"), ["0", "0", "1", "0"]);
    assert_eq!(cells(&df, "health_status_exit"), ["0", "1", "1", "1"]);
    assert_eq!(cells(&df, "income_entry"), ["0", "0", "500", "0"]);
    assert_eq!(cells(&df, "income_exit"), ["0", "1000", "400", "300"]);
    assert_eq!(cells(&df, "ProjectNumeric"), ["1", "2", "2", "1"]);
    assert_eq!(
        cells(&df, "ProjectType"),
        [
            "Emergency Shelter",
            "Transitional Housing",
            "Transitional Housing",
            "Emergency Shelter",
        ]
    );
}

#[test]
fn merged_column_layout() {
    let fixture = Fixture::new();
    let df = fixture.merge(&no_groups()).unwrap();
    let names: Vec<&str> = df.get_column_names_str();
    insta::assert_json_snapshot!(names, @r#"
    [
      "personID",
      "person_enrollID",
      "programID",
      "groupID",
      "entrydate",
      "DestinationNumeric",
      "DestinationDescription",
      "DestinationGroup",
      "DestinationSuccess",
      "Subsidy",
      "exitdate",
      "dob",
      "gender",
      "veteran",
      "first_name",
      "Physical_entry",
      "Physical_exit",
      "employed_entry",
      "employed_exit",
      "health_status_entry",
      "health_status_exit",
      "income_entry",
      "income_exit",
      "ProjectNumeric",
      "ProjectType"
    ]
    "#);
}

#[test]
fn name_exclusion_removes_placeholder_persons() {
    let fixture = Fixture::new();
    let output = merge_tables_with_report(
        &fixture.meta_files,
        fixture.dir.path(),
        &[YEAR.to_string()],
        &no_groups().with_name_exclusion(true),
        &destinations(),
    )
    .unwrap();
    assert_eq!(output.excluded_enrollments, 1);
    assert_eq!(cells(&output.frame, "person_enrollID"), ["10", "30", "40"]);
    assert_eq!(cells(&output.frame, "first_name"), ["AAA", "CCC", "DDD"]);
    assert_eq!(output.reports.len(), TableKind::ALL.len());

    let full = fixture.merge(&no_groups()).unwrap();
    let full_ids = cells(&full, "person_enrollID");
    assert!(
        cells(&output.frame, "person_enrollID")
            .iter()
            .all(|id| full_ids.contains(id))
    );
}

#[test]
fn spine_rows_survive_missing_child_rows() {
    let fixture = Fixture::new();
    fixture.write_csv(
        TableKind::Income,
        "ppid,stage,income\n10,0,0\n10,1,0\n20,0,0\n20,1,1000\n",
    );
    fixture.write_csv(TableKind::Project, "pr_id,type\n100,1\n");
    let df = fixture.merge(&MergeOptions::default()).unwrap();
    assert_eq!(df.height(), 4);
    assert_eq!(cells(&df, "income_exit"), ["0", "1000", "", ""]);
    assert_eq!(cells(&df, "ProjectNumeric"), ["1", "", "", "1"]);
}

#[test]
fn groups_collapse_shared_group_ids() {
    let fixture = Fixture::new();
    fixture.write_csv(
        TableKind::Enrollment,
        "personID,person_enrollID,programID,groupID,entrydate\n\
         1,10,100,1000,2011-01-13\n\
         2,20,200,1000,2011-06-10\n\
         3,30,200,3000,2011-12-05\n\
         4,40,100,,2011-09-10\n",
    );
    let grouped = fixture.merge(&MergeOptions::default()).unwrap();
    assert_eq!(cells(&grouped, "person_enrollID"), ["10", "30", "40"]);
    let ungrouped = fixture.merge(&no_groups()).unwrap();
    assert_eq!(ungrouped.height(), 4);
}

#[test]
fn repeated_child_keys_keep_the_last_row() {
    let mut fixture = Fixture::new();
    fixture.write_csv(
        TableKind::Project,
        "pr_id,project_name,type\n\
         100,shelter1,1\n\
         100,shelter1-renamed,1\n\
         200,transitional,2\n",
    );
    fixture.write_meta(
        TableKind::Project,
        json!({
            "program_ID": "pr_id",
            "project_type_column": "type",
            "duplicate_check_columns": ["pr_id", "project_name", "type"],
        }),
    );
    let output = merge_tables_with_report(
        &fixture.meta_files,
        fixture.dir.path(),
        &[YEAR.to_string()],
        &no_groups(),
        &destinations(),
    )
    .unwrap();
    assert_eq!(output.frame.height(), 4);
    assert_eq!(
        cells(&output.frame, "project_name"),
        ["shelter1-renamed", "transitional", "transitional", "shelter1-renamed"]
    );
    assert_eq!(cells(&output.frame, "ProjectNumeric"), ["1", "2", "2", "1"]);
    let project = output
        .reports
        .iter()
        .find(|report| report.table == "project")
        .unwrap();
    assert_eq!(project.rows_kept, 2);
    assert_eq!(project.warnings.len(), 1);
}

#[test]
fn missing_metadata_file_is_named() {
    let fixture = Fixture::new();
    let partial: MetaFiles = fixture
        .meta_files
        .iter()
        .filter(|(kind, _)| *kind != TableKind::Project)
        .map(|(kind, path)| (kind, path.to_path_buf()))
        .collect();
    let err = merge_tables(
        &partial,
        fixture.dir.path(),
        &[YEAR.to_string()],
        &MergeOptions::default(),
        &destinations(),
    )
    .unwrap_err();
    match err {
        CoreError::Config(ConfigError::MissingKeys { table, keys }) => {
            assert_eq!(table, "meta_files");
            assert_eq!(keys, vec!["project".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn metadata_is_validated_before_data_is_read() {
    let mut fixture = Fixture::new();
    fixture.write_meta(
        TableKind::Income,
        with_stages(json!({
            "person_enrollment_ID": "ppid",
            "duplicate_check_columns": ["ppid", "stage"],
        })),
    );
    fs::remove_file(fixture.year_dir().join(TableKind::Enrollment.file_name())).unwrap();
    match fixture.merge(&MergeOptions::default()).unwrap_err() {
        CoreError::Config(ConfigError::MissingKeys { table, keys }) => {
            assert_eq!(table, "income");
            assert_eq!(keys, vec!["columns_to_take_max".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_year_directory_is_a_config_error() {
    let fixture = Fixture::new();
    let err = merge_tables(
        &fixture.meta_files,
        fixture.dir.path(),
        &["2011".to_string(), "2019".to_string()],
        &MergeOptions::default(),
        &destinations(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Config(ConfigError::MissingDirectory { .. })
    ));
}
