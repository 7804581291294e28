use std::collections::BTreeMap;

use serde::Serialize;

/// Data-quality counts collected while cleaning one table.
///
/// Nothing recorded here is fatal: the affected values were recoded to null
/// and the pipeline carried on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub table: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub duplicates_dropped: usize,
    /// Unparseable time values recoded to null, per column.
    pub time_values_nulled: BTreeMap<String, usize>,
    /// Sentinel or out-of-domain categorical codes recoded to null, per column.
    pub categorical_values_nulled: BTreeMap<String, usize>,
    /// Other warnings raised by entity cleaners.
    pub warnings: Vec<String>,
}

impl CleaningReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Total number of recoded values and warnings.
    pub fn warning_count(&self) -> usize {
        self.time_values_nulled.values().sum::<usize>()
            + self.categorical_values_nulled.values().sum::<usize>()
            + self.warnings.len()
    }
}
