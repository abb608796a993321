//! Menu operations: the CSV pipeline, the capture pipeline and cleanup
//!
//! Each operation receives its configuration, HTTP client and confirmation
//! strategy explicitly and keeps no state between runs.

pub mod cleanup;
pub mod csv;
pub mod pcap;

use std::path::{Path, PathBuf};

use log::{info, warn};
use url::Url;

use crate::core::confirm::Confirm;
use crate::core::downloader::Downloader;
use crate::core::error::Result;
use crate::core::layout::{clear_dir, has_entries};
use crate::core::listing::local_name;

pub use self::cleanup::{cleanup, CleanupOutcome};
pub use self::csv::{process_csv, CsvOutcome};
pub use self::pcap::{process_pcap, PcapOutcome};

/// One remote file and where it is stored locally
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub url: Url,
    pub dest: PathBuf,
    /// Short name shown in progress output
    pub label: String,
}

/// Local name for a listed entry, or `None` with a warning when it cannot be stored
fn storable_name(entry: &str) -> Option<String> {
    match local_name(entry) {
        Ok(name) => Some(name),
        Err(e) => {
            warn!("Skipping listed entry: {e}");
            None
        }
    }
}

/// Push `transfer` unless its destination is already planned
fn plan(transfers: &mut Vec<Transfer>, transfer: Transfer) {
    if transfers.iter().any(|t| t.dest == transfer.dest) {
        warn!("{} is listed more than once; downloading it once", transfer.label);
        return;
    }
    transfers.push(transfer);
}

/// Offer to clear a non-empty raw directory. Returns whether downloads should run.
fn prepare_raw_dir(dir: &Path, confirm: &dyn Confirm) -> Result<bool> {
    if !has_entries(dir)? {
        return Ok(true);
    }
    info!("Files already exist in {}.", dir.display());
    if confirm.confirm("Would you like to delete and re-download them?")? {
        let removed = clear_dir(dir)?;
        info!("Removed {removed} existing entries from {}.", dir.display());
        Ok(true)
    } else {
        info!("Skipping download.");
        Ok(false)
    }
}

/// Download every transfer in order, stopping at the first failure
async fn download_all(downloader: &Downloader, transfers: &[Transfer]) -> Result<()> {
    let total = transfers.len();
    for (index, transfer) in transfers.iter().enumerate() {
        info!("[{}/{total}] Downloading {}", index + 1, transfer.label);
        let bytes = downloader
            .download_to_file(&transfer.url, &transfer.dest, &transfer.label)
            .await?;
        log::debug!("{} bytes -> {}", bytes, transfer.dest.display());
    }
    Ok(())
}

/// Local paths of the planned transfers that exist on disk
fn present_inputs(transfers: &[Transfer]) -> Vec<PathBuf> {
    transfers
        .iter()
        .filter_map(|transfer| {
            if transfer.dest.is_file() {
                Some(transfer.dest.clone())
            } else {
                warn!("{} is not present locally; leaving it out", transfer.dest.display());
                None
            }
        })
        .collect()
}

/// Offer to replace an existing merged output. Returns whether the merge should run.
///
/// The old output stays in place; a successful merge replaces it.
fn confirm_replace(merged: &Path, confirm: &dyn Confirm) -> Result<bool> {
    if !merged.exists() {
        return Ok(true);
    }
    info!("Merged dataset already exists at {}.", merged.display());
    if confirm.confirm("Would you like to delete and re-merge the datasets?")? {
        Ok(true)
    } else {
        info!("Skipping merge.");
        Ok(false)
    }
}
