//! CLI argument definitions for the HMIS merge.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "hmis",
    version,
    about = "Clean HMIS extracts and merge them into one analytic table",
    long_about = "Clean yearly HMIS CSV extracts and merge them into one row per enrollment.\n\n\
                  Each table is described by a JSON metadata document; a TOML run\n\
                  configuration names the data directory, the year folders and the\n\
                  metadata file for every table."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Clean every table and merge them onto the enrollment spine.
    Merge(MergeArgs),

    /// List the supported tables, their default file names and required keys.
    Tables,
}

#[derive(Parser, Default)]
pub struct MergeArgs {
    /// Run configuration (TOML).
    #[arg(long = "config", value_name = "FILE")]
    pub config: PathBuf,

    /// Write the merged table to this CSV file.
    #[arg(long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Keep every enrollment instead of one row per group.
    #[arg(long = "no-groups")]
    pub no_groups: bool,

    /// Drop client records whose names hold the placeholder.
    #[arg(long = "name-exclusion")]
    pub name_exclusion: bool,

    /// Days within which two client birth dates count as the same person.
    #[arg(long = "dob-tolerance-days", value_name = "DAYS")]
    pub dob_tolerance_days: Option<i64>,

    /// Birth dates before January 1 of this year are nulled in the merge.
    #[arg(long = "min-dob-year", value_name = "YEAR")]
    pub min_dob_year: Option<i32>,

    /// Destination mapping CSV (overrides the run configuration).
    #[arg(long = "destinations", value_name = "FILE")]
    pub destinations: Option<PathBuf>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
