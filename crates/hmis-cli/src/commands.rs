use std::fs::File;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::Table;
use hmis_core::merge_tables_with_report;
use hmis_ingest::{default_destination_path, load_destination_map};
use hmis_model::TableKind;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use tracing::{info, info_span};

use crate::cli::MergeArgs;
use crate::config::RunConfig;
use crate::summary::apply_table_style;
use crate::types::{MergeSummary, TableSummary};

pub fn run_tables() -> Result<()> {
    println!("{}", tables_table());
    Ok(())
}

/// One row per supported table: config key, default file name, required keys.
pub fn tables_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Table", "File", "Required metadata keys"]);
    apply_table_style(&mut table);
    for kind in TableKind::ALL {
        table.add_row(vec![
            kind.as_str().to_string(),
            kind.file_name().to_string(),
            kind.required_keys().join(", "),
        ]);
    }
    table
}

pub fn run_merge(args: &MergeArgs) -> Result<MergeSummary> {
    let mut config = RunConfig::load(&args.config)?;
    config.apply_args(args);
    let span = info_span!("run", config = %args.config.display());
    let _guard = span.enter();
    let started = Instant::now();

    let destination_path = config
        .destinations
        .clone()
        .unwrap_or_else(default_destination_path);
    let destinations = load_destination_map(&destination_path).with_context(|| {
        format!("load destination mapping {}", destination_path.display())
    })?;

    let output = merge_tables_with_report(
        &config.meta_files(),
        &config.data_dir,
        &config.paths,
        &config.options,
        &destinations,
    )
    .context("merge tables")?;
    let mut frame = output.frame;
    if let Some(path) = &args.output {
        write_csv(&mut frame, path)?;
    }
    info!(
        rows = frame.height(),
        columns = frame.width(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "merge finished"
    );

    Ok(MergeSummary {
        tables: output.reports.iter().map(TableSummary::from).collect(),
        rows: frame.height(),
        columns: frame.width(),
        excluded_enrollments: output.excluded_enrollments,
        output: args.output.clone(),
    })
}

fn write_csv(frame: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("create output {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(frame)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
