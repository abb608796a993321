//! Local filesystem layout helpers
//!
//! The data directories are owned exclusively by this tool; nothing here locks
//! against concurrent modification.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::core::config::DatasetConfig;
use crate::core::error::Result;

/// Create both raw directories and the parents of both merged outputs
pub fn ensure_layout(config: &DatasetConfig) -> Result<()> {
    fs::create_dir_all(&config.raw_csv_dir)?;
    fs::create_dir_all(&config.raw_pcap_dir)?;
    for merged in [&config.merged_csv_path, &config.merged_pcap_path] {
        if let Some(parent) = merged.parent() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Whether `dir` exists and contains at least one entry
pub fn has_entries(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Remove every entry under `dir`, recursing into subdirectories, keeping `dir` itself.
///
/// Returns the number of top-level entries removed. A missing `dir` counts as empty.
pub fn clear_dir(dir: &Path) -> Result<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        // symlinks are unlinked, never followed
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!("Removed {}", path.display());
        removed += 1;
    }
    Ok(removed)
}

/// Sibling path `<output>.part` that a merge writes before replacing `output`
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Delete a file if present, reporting whether anything was removed
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
