use std::path::PathBuf;

use hmis_ingest::CleaningReport;
use serde::Serialize;

/// Outcome of a merge run, as shown in the summary table.
#[derive(Debug, Clone, Serialize)]
pub struct MergeSummary {
    pub tables: Vec<TableSummary>,
    pub rows: usize,
    pub columns: usize,
    pub excluded_enrollments: usize,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: String,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub duplicates_dropped: usize,
    pub warnings: usize,
}

impl From<&CleaningReport> for TableSummary {
    fn from(report: &CleaningReport) -> Self {
        Self {
            table: report.table.clone(),
            rows_read: report.rows_read,
            rows_kept: report.rows_kept,
            duplicates_dropped: report.duplicates_dropped,
            warnings: report.warning_count(),
        }
    }
}

impl MergeSummary {
    pub fn total_warnings(&self) -> usize {
        self.tables.iter().map(|table| table.warnings).sum()
    }
}
