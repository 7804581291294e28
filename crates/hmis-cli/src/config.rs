//! TOML run configuration.
//!
//! ```toml
//! data_dir = "extracts"
//! paths = ["2011", "2012"]
//! destinations = "destination_mappings.csv"
//!
//! [meta_files]
//! enrollment = "meta/enrollment.json"
//! # ...one entry per table
//!
//! [options]
//! groups = true
//! name_exclusion = false
//! dob_tolerance_days = 30
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hmis_core::MetaFiles;
use hmis_model::{MergeOptions, TableKind};
use serde::Deserialize;

use crate::cli::MergeArgs;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub paths: Vec<String>,
    pub meta_files: BTreeMap<TableKind, PathBuf>,
    /// Destination mapping CSV; the bundled table is used when absent.
    #[serde(default)]
    pub destinations: Option<PathBuf>,
    #[serde(default)]
    pub options: MergeOptions,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read run configuration {}", path.display()))?;
        let mut config: RunConfig = toml::from_str(&text)
            .with_context(|| format!("parse run configuration {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.data_dir);
        self.meta_files.values_mut().for_each(resolve);
        if let Some(path) = self.destinations.as_mut() {
            resolve(path);
        }
    }

    /// Applies command-line overrides.
    pub fn apply_args(&mut self, args: &MergeArgs) {
        if args.no_groups {
            self.options.groups = false;
        }
        if args.name_exclusion {
            self.options.name_exclusion = true;
        }
        if let Some(days) = args.dob_tolerance_days {
            self.options.dob_tolerance_days = days;
        }
        if let Some(year) = args.min_dob_year {
            self.options.min_dob_year = year;
        }
        if let Some(path) = &args.destinations {
            self.destinations = Some(path.clone());
        }
    }

    pub fn meta_files(&self) -> MetaFiles {
        self.meta_files
            .iter()
            .map(|(kind, path)| (*kind, path.clone()))
            .collect()
    }
}
