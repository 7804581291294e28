pub mod entities;
pub mod error;
pub mod frame_utils;
pub mod join;
pub mod merge;
pub mod pivot;
pub mod reconcile;

pub use entities::{
    ClientTable, SourceArgs, clean_client, clean_disabilities, clean_enrollment,
    clean_entry_exit_table, clean_exit, clean_income, clean_project, get_client, get_disabilities,
    get_employment_education, get_enrollment, get_exit, get_health_dv, get_income, get_project,
    read_entry_exit_table,
};
pub use error::{CoreError, Result};
pub use join::{JoinIndices, JoinKind, join_frames, join_indices};
pub use merge::{MergeOutput, MetaFiles, merge_tables, merge_tables_with_report};
pub use pivot::{StageIndex, StageRows, pivot_by_stage};
pub use reconcile::{FieldRule, ReconcileRules, collapse_groups, mean_time};
