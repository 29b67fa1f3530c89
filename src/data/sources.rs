//! Data Source Resolution
//! Maps a data-source selection to the concrete CSV paths the loader reads.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Resolved locations of the two tables of one data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePaths {
    pub metrics: PathBuf,
    pub priorities: PathBuf,
}

impl SourcePaths {
    /// `source` names a subdirectory of `data_root`; `None` reads the files
    /// from `data_root` itself.
    pub fn resolve(
        data_root: &Path,
        source: Option<&str>,
        metrics_file: &str,
        priority_file: &str,
    ) -> Self {
        let dir = match source {
            Some(name) if !name.is_empty() => data_root.join(name),
            _ => data_root.to_path_buf(),
        };
        Self {
            metrics: dir.join(metrics_file),
            priorities: dir.join(priority_file),
        }
    }
}

/// Sorted names of the visible subdirectories of `data_root`.
pub fn list_sources(data_root: &Path) -> io::Result<Vec<String>> {
    let mut names: Vec<String> = fs::read_dir(data_root)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();
    Ok(names)
}
