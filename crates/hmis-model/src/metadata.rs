//! Table metadata documents and their typed per-table views.
//!
//! A metadata document is a flat JSON object describing one source table.
//! Each operation declares the keys it needs through
//! [`TableMetadata::REQUIRED_KEYS`]; [`require`] checks them all at once so a
//! broken document reports every missing key in one error.

use std::collections::BTreeMap;

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, Result};

/// Sentinel codes treated as "missing" in categorical columns unless the
/// document overrides `categorical_missing_codes`.
pub const DEFAULT_MISSING_CODES: [i64; 3] = [8, 9, 99];

/// Placeholder written into name fields for anonymous clients.
pub const DEFAULT_NAME_PLACEHOLDER: &str = "noname";

/// An untyped metadata document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDocument {
    table: String,
    values: Map<String, Value>,
}

impl MetadataDocument {
    /// Wraps a parsed JSON value.
    ///
    /// `label` names the table in errors when the document has no `name` key.
    pub fn from_value(label: &str, value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => {
                let table = values
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(label)
                    .to_string();
                Ok(Self { table, values })
            }
            other => Err(ConfigError::InvalidMetadata {
                table: label.to_string(),
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
            }),
        }
    }

    /// The table name used in error messages.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Checks that every key in `required_keys` is present.
    pub fn require(&self, required_keys: &[&str]) -> Result<()> {
        require(self, required_keys)
    }

    /// Deserializes the document into a typed view without checking keys.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone())).map_err(|err| {
            ConfigError::InvalidMetadata {
                table: self.table.clone(),
                reason: err.to_string(),
            }
        })
    }
}

/// Fails with [`ConfigError::MissingKeys`] naming every absent key.
pub fn require(metadata: &MetadataDocument, required_keys: &[&str]) -> Result<()> {
    let missing: Vec<String> = required_keys
        .iter()
        .filter(|key| !metadata.contains(key))
        .map(|key| (*key).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingKeys {
            table: metadata.table().to_string(),
            keys: missing,
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A typed view over a metadata document for one operation.
pub trait TableMetadata: DeserializeOwned {
    /// Keys that must be present before the operation touches any data.
    const REQUIRED_KEYS: &'static [&'static str];

    /// Validates required keys, then deserializes.
    fn from_document(document: &MetadataDocument) -> Result<Self> {
        document.require(Self::REQUIRED_KEYS)?;
        document.deserialize()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrList {
    One(String),
    List(Vec<String>),
}

/// Accepts an ID column given either as a string or as a one-element list.
fn column_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match OneOrList::deserialize(deserializer)? {
        OneOrList::One(name) => Ok(name),
        OneOrList::List(mut names) if names.len() == 1 => Ok(names.remove(0)),
        OneOrList::List(names) => Err(D::Error::custom(format!(
            "expected a single column name, found a list of {}",
            names.len()
        ))),
    }
}

fn default_missing_codes() -> Vec<i64> {
    DEFAULT_MISSING_CODES.to_vec()
}

fn default_name_placeholder() -> String {
    DEFAULT_NAME_PLACEHOLDER.to_string()
}

/// Generic cleaning applied by the table loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningSpec {
    /// Columns defining row identity for duplicate detection.
    pub duplicate_check_columns: Vec<String>,
    #[serde(default)]
    pub columns_to_drop: Vec<String>,
    #[serde(default)]
    pub categorical_var: Vec<String>,
    #[serde(default)]
    pub time_var: Vec<String>,
    /// Codes recoded to null in every categorical column.
    #[serde(default = "default_missing_codes")]
    pub categorical_missing_codes: Vec<i64>,
    /// Optional per-column domain; codes outside it are recoded to null.
    #[serde(default)]
    pub categorical_valid_values: BTreeMap<String, Vec<i64>>,
    /// When duplicates collide, keep the row with the highest value here.
    #[serde(default)]
    pub dedup_tiebreak_column: Option<String>,
}

impl Default for CleaningSpec {
    fn default() -> Self {
        Self {
            duplicate_check_columns: Vec::new(),
            columns_to_drop: Vec::new(),
            categorical_var: Vec::new(),
            time_var: Vec::new(),
            categorical_missing_codes: default_missing_codes(),
            categorical_valid_values: BTreeMap::new(),
            dedup_tiebreak_column: None,
        }
    }
}

impl CleaningSpec {
    pub fn new<I, S>(duplicate_check_columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            duplicate_check_columns: duplicate_check_columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_categorical<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categorical_var = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_time<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.time_var = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dropped<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns_to_drop = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_categorical(&self, column: &str) -> bool {
        self.categorical_var.iter().any(|name| name == column)
    }

    pub fn is_time(&self, column: &str) -> bool {
        self.time_var.iter().any(|name| name == column)
    }
}

impl TableMetadata for CleaningSpec {
    const REQUIRED_KEYS: &'static [&'static str] = &["duplicate_check_columns"];
}

/// A point in an enrollment's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionStage {
    Entry,
    Exit,
    Update,
    AnnualAssessment,
    PostExit,
}

/// Collection stage column and the code recorded for each stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSpec {
    pub collection_stage_column: String,
    pub entry_stage_val: i64,
    pub exit_stage_val: i64,
    pub update_stage_val: i64,
    pub annual_assessment_stage_val: i64,
    pub post_exit_stage_val: i64,
}

impl StageSpec {
    pub const REQUIRED_KEYS: &'static [&'static str] = &[
        "collection_stage_column",
        "entry_stage_val",
        "exit_stage_val",
        "update_stage_val",
        "annual_assessment_stage_val",
        "post_exit_stage_val",
    ];

    /// Maps a raw stage code to its stage. Unknown codes map to `None`.
    pub fn stage_of(&self, code: i64) -> Option<CollectionStage> {
        if code == self.entry_stage_val {
            Some(CollectionStage::Entry)
        } else if code == self.exit_stage_val {
            Some(CollectionStage::Exit)
        } else if code == self.annual_assessment_stage_val {
            Some(CollectionStage::AnnualAssessment)
        } else if code == self.update_stage_val {
            Some(CollectionStage::Update)
        } else if code == self.post_exit_stage_val {
            Some(CollectionStage::PostExit)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(rename = "person_enrollment_ID", deserialize_with = "column_name")]
    pub person_enrollment_id: String,
    #[serde(rename = "person_ID", deserialize_with = "column_name")]
    pub person_id: String,
    #[serde(rename = "program_ID", deserialize_with = "column_name")]
    pub program_id: String,
    #[serde(rename = "groupID_column", deserialize_with = "column_name")]
    pub group_id_column: String,
    #[serde(deserialize_with = "column_name")]
    pub entry_date: String,
}

impl TableMetadata for EnrollmentMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_enrollment_ID",
        "person_ID",
        "program_ID",
        "groupID_column",
        "entry_date",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(rename = "person_enrollment_ID", deserialize_with = "column_name")]
    pub person_enrollment_id: String,
    #[serde(deserialize_with = "column_name")]
    pub destination_column: String,
}

impl TableMetadata for ExitMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_enrollment_ID",
        "destination_column",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(rename = "person_ID", deserialize_with = "column_name")]
    pub person_id: String,
    #[serde(deserialize_with = "column_name")]
    pub dob_column: String,
    pub name_columns: Vec<String>,
    /// Yes/no columns; merged records take the maximum.
    #[serde(default)]
    pub boolean: Vec<String>,
    /// Coded columns; conflicting codes reconcile to null.
    #[serde(default)]
    pub numeric_code: Vec<String>,
    #[serde(default = "default_name_placeholder")]
    pub name_placeholder: String,
    #[serde(default)]
    pub dob_tolerance_days: Option<i64>,
}

impl ClientMetadata {
    /// Tolerance to use, preferring an explicit override over the document.
    pub fn tolerance_days(&self, explicit: Option<i64>) -> i64 {
        explicit
            .or(self.dob_tolerance_days)
            .unwrap_or(crate::options::DEFAULT_DOB_TOLERANCE_DAYS)
    }
}

impl TableMetadata for ClientMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_ID",
        "dob_column",
        "name_columns",
    ];
}

/// Metadata for a generic stage-indexed table such as employment/education
/// or health/DV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryExitMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(flatten)]
    pub stages: StageSpec,
    #[serde(rename = "person_enrollment_ID", deserialize_with = "column_name")]
    pub person_enrollment_id: String,
}

impl TableMetadata for EntryExitMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_enrollment_ID",
        "collection_stage_column",
        "entry_stage_val",
        "exit_stage_val",
        "update_stage_val",
        "annual_assessment_stage_val",
        "post_exit_stage_val",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisabilitiesMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(flatten)]
    pub stages: StageSpec,
    #[serde(rename = "person_enrollment_ID", deserialize_with = "column_name")]
    pub person_enrollment_id: String,
    #[serde(deserialize_with = "column_name")]
    pub type_column: String,
    #[serde(deserialize_with = "column_name")]
    pub response_column: String,
}

impl TableMetadata for DisabilitiesMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_enrollment_ID",
        "collection_stage_column",
        "entry_stage_val",
        "exit_stage_val",
        "update_stage_val",
        "annual_assessment_stage_val",
        "post_exit_stage_val",
        "type_column",
        "response_column",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(flatten)]
    pub stages: StageSpec,
    #[serde(rename = "person_enrollment_ID", deserialize_with = "column_name")]
    pub person_enrollment_id: String,
    pub columns_to_take_max: Vec<String>,
}

impl TableMetadata for IncomeMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "person_enrollment_ID",
        "collection_stage_column",
        "entry_stage_val",
        "exit_stage_val",
        "update_stage_val",
        "annual_assessment_stage_val",
        "post_exit_stage_val",
        "columns_to_take_max",
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    #[serde(flatten)]
    pub cleaning: CleaningSpec,
    #[serde(rename = "program_ID", deserialize_with = "column_name")]
    pub program_id: String,
    #[serde(deserialize_with = "column_name")]
    pub project_type_column: String,
}

impl TableMetadata for ProjectMetadata {
    const REQUIRED_KEYS: &'static [&'static str] = &[
        "duplicate_check_columns",
        "program_ID",
        "project_type_column",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> MetadataDocument {
        MetadataDocument::from_value("test", value).expect("object document")
    }

    fn stage_keys() -> Value {
        json!({
            "collection_stage_column": "stage",
            "entry_stage_val": 0,
            "exit_stage_val": 1,
            "update_stage_val": 2,
            "annual_assessment_stage_val": 5,
            "post_exit_stage_val": 6
        })
    }

    #[test]
    fn require_names_every_missing_key() {
        let doc = document(json!({
            "name": "disabilities",
            "duplicate_check_columns": ["pid", "stage", "type"],
            "categorical_var": ["response"]
        }));
        let err = DisabilitiesMetadata::from_document(&doc).unwrap_err();
        match err {
            ConfigError::MissingKeys { table, keys } => {
                assert_eq!(table, "disabilities");
                assert_eq!(keys.len(), 9);
                assert!(keys.contains(&"person_enrollment_ID".to_string()));
                assert!(keys.contains(&"type_column".to_string()));
                assert!(keys.contains(&"response_column".to_string()));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_object_document_is_invalid() {
        let err = MetadataDocument::from_value("exit", json!(["a"])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetadata { .. }));
    }

    #[test]
    fn optional_cleaning_lists_default_to_empty() {
        let doc = document(json!({"duplicate_check_columns": ["id"]}));
        let spec = CleaningSpec::from_document(&doc).unwrap();
        assert!(spec.columns_to_drop.is_empty());
        assert!(spec.categorical_var.is_empty());
        assert!(spec.time_var.is_empty());
        assert_eq!(spec.categorical_missing_codes, vec![8, 9, 99]);
        assert_eq!(spec.dedup_tiebreak_column, None);
    }

    #[test]
    fn id_columns_accept_one_element_lists() {
        let doc = document(json!({
            "duplicate_check_columns": ["ppid"],
            "person_enrollment_ID": ["ppid"],
            "destination_column": "dest_num"
        }));
        let exit = ExitMetadata::from_document(&doc).unwrap();
        assert_eq!(exit.person_enrollment_id, "ppid");
        assert_eq!(exit.destination_column, "dest_num");
        assert_eq!(exit.cleaning.duplicate_check_columns, vec!["ppid"]);
    }

    #[test]
    fn id_columns_reject_longer_lists() {
        let doc = document(json!({
            "duplicate_check_columns": ["ppid"],
            "person_enrollment_ID": ["ppid", "other"],
            "destination_column": "dest_num"
        }));
        let err = ExitMetadata::from_document(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetadata { .. }));
    }

    #[test]
    fn wrong_value_shape_is_invalid_metadata() {
        let doc = document(json!({
            "duplicate_check_columns": "id",
            "program_ID": "pr_id",
            "project_type_column": "type"
        }));
        let err = ProjectMetadata::from_document(&doc).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetadata { .. }));
    }

    #[test]
    fn stage_metadata_flattens_stage_constants() {
        let mut value = stage_keys();
        value["duplicate_check_columns"] = json!(["id", "stage"]);
        value["person_enrollment_ID"] = json!("id");
        value["columns_to_take_max"] = json!(["income"]);
        let income = IncomeMetadata::from_document(&document(value)).unwrap();
        assert_eq!(income.stages.collection_stage_column, "stage");
        assert_eq!(income.stages.stage_of(0), Some(CollectionStage::Entry));
        assert_eq!(income.stages.stage_of(1), Some(CollectionStage::Exit));
        assert_eq!(income.stages.stage_of(2), Some(CollectionStage::Update));
        assert_eq!(
            income.stages.stage_of(5),
            Some(CollectionStage::AnnualAssessment)
        );
        assert_eq!(income.stages.stage_of(6), Some(CollectionStage::PostExit));
        assert_eq!(income.stages.stage_of(7), None);
    }

    #[test]
    fn client_defaults() {
        let doc = document(json!({
            "duplicate_check_columns": ["pid", "dob"],
            "person_ID": "pid",
            "dob_column": "dob",
            "name_columns": ["first_name"]
        }));
        let client = ClientMetadata::from_document(&doc).unwrap();
        assert_eq!(client.name_placeholder, "noname");
        assert!(client.boolean.is_empty());
        assert_eq!(client.tolerance_days(None), 30);
        assert_eq!(client.tolerance_days(Some(3)), 3);
    }

    #[test]
    fn client_tolerance_from_document() {
        let doc = document(json!({
            "duplicate_check_columns": ["pid"],
            "person_ID": "pid",
            "dob_column": "dob",
            "name_columns": ["first_name"],
            "dob_tolerance_days": 7
        }));
        let client = ClientMetadata::from_document(&doc).unwrap();
        assert_eq!(client.tolerance_days(None), 7);
    }
}
