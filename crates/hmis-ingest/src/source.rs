//! Table source specification and year-directory path resolution.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hmis_model::ConfigError;

/// Where a table's extract files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableSource {
    /// A single file.
    Path(PathBuf),
    /// One file per year label.
    Years(BTreeMap<String, PathBuf>),
    /// A file name resolved inside each year directory under a data directory.
    FileName(String),
}

impl TableSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        TableSource::Path(path.into())
    }

    pub fn file_name(name: impl Into<String>) -> Self {
        TableSource::FileName(name.into())
    }

    pub fn years<I, K, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<PathBuf>,
    {
        TableSource::Years(
            entries
                .into_iter()
                .map(|(label, path)| (label.into(), path.into()))
                .collect(),
        )
    }

    /// A short name for logs and errors, taken from the file stem.
    pub fn label(&self) -> String {
        let path = match self {
            TableSource::Path(path) => Some(path.as_path()),
            TableSource::Years(years) => years.values().next().map(PathBuf::as_path),
            TableSource::FileName(name) => Some(Path::new(name.as_str())),
        };
        path.and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string())
    }

    /// Resolves the source to concrete files keyed by year label.
    ///
    /// `data_dir` and `paths` are only meaningful for [`TableSource::FileName`];
    /// supplying them with any other variant is contradictory.
    pub fn resolve(
        &self,
        data_dir: Option<&Path>,
        paths: Option<&[String]>,
    ) -> Result<BTreeMap<String, PathBuf>, ConfigError> {
        match self {
            TableSource::FileName(name) => match (data_dir, paths) {
                (Some(data_dir), Some(paths)) => std_path_setup(name, data_dir, paths),
                _ => Err(ConfigError::MissingSourceContext {
                    file_name: name.clone(),
                }),
            },
            TableSource::Path(path) => {
                reject_context(data_dir, paths)?;
                let mut files = BTreeMap::new();
                files.insert(self.label(), path.clone());
                Ok(files)
            }
            TableSource::Years(years) => {
                reject_context(data_dir, paths)?;
                if years.is_empty() {
                    return Err(ConfigError::AmbiguousSource {
                        reason: "year map has no entries".to_string(),
                    });
                }
                Ok(years.clone())
            }
        }
    }
}

fn reject_context(data_dir: Option<&Path>, paths: Option<&[String]>) -> Result<(), ConfigError> {
    if data_dir.is_some() || paths.is_some() {
        return Err(ConfigError::AmbiguousSource {
            reason: "a data directory or year paths cannot be combined with an explicit file path"
                .to_string(),
        });
    }
    Ok(())
}

/// Builds `join(data_dir, path, filename)` for every year path.
///
/// Fails if a year directory does not exist. The files themselves are only
/// checked when read.
pub fn std_path_setup(
    filename: &str,
    data_dir: &Path,
    paths: &[String],
) -> Result<BTreeMap<String, PathBuf>, ConfigError> {
    if paths.is_empty() {
        return Err(ConfigError::MissingSourceContext {
            file_name: filename.to_string(),
        });
    }
    let mut files = BTreeMap::new();
    for label in paths {
        let directory = data_dir.join(label);
        if !directory.is_dir() {
            return Err(ConfigError::MissingDirectory { path: directory });
        }
        files.insert(label.clone(), directory.join(filename));
    }
    Ok(files)
}
