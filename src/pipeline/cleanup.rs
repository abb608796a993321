//! Cleanup: remove every downloaded file and both merged outputs

use log::info;

use crate::core::confirm::Confirm;
use crate::core::config::DatasetConfig;
use crate::core::error::Result;
use crate::core::layout::{clear_dir, remove_if_exists};

/// How a cleanup request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Number of raw entries and merged files deleted
    Removed { entries: usize },
    Declined,
}

/// Empty both raw directories and delete both merged outputs, after confirmation
pub fn cleanup(config: &DatasetConfig, confirm: &dyn Confirm) -> Result<CleanupOutcome> {
    let question = format!(
        "This permanently deletes everything in {} and {} plus both merged datasets. Continue?",
        config.raw_csv_dir.display(),
        config.raw_pcap_dir.display()
    );
    if !confirm.confirm(&question)? {
        info!("Cleanup cancelled.");
        return Ok(CleanupOutcome::Declined);
    }

    let mut entries = clear_dir(&config.raw_csv_dir)? + clear_dir(&config.raw_pcap_dir)?;
    for merged in [&config.merged_csv_path, &config.merged_pcap_path] {
        if remove_if_exists(merged)? {
            entries += 1;
        }
    }

    info!("Removed {entries} entries.");
    Ok(CleanupOutcome::Removed { entries })
}
