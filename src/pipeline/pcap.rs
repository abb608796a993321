//! Capture pipeline: list capture directories, download every capture, merge them

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::core::confirm::Confirm;
use crate::core::config::DatasetConfig;
use crate::core::downloader::Downloader;
use crate::core::error::Result;
use crate::core::layout::{partial_path, remove_if_exists};
use crate::core::listing::{fetch_listing, ListingFilter};
use crate::core::merge::{CaptureMerger, MergeError};

use super::{
    confirm_replace, download_all, plan, prepare_raw_dir, present_inputs, storable_name, Transfer,
};

/// How a capture pipeline run ended
#[derive(Debug, Clone, PartialEq)]
pub enum PcapOutcome {
    /// The merge utility wrote `output` from `inputs` captures
    Merged { inputs: usize, output: PathBuf },
    /// A merged capture already existed and was kept
    MergeDeclined,
    /// None of the listed captures are available locally
    NoInputs,
    /// The merge utility is not installed
    MergerMissing(String),
    /// The merge utility ran and failed
    MergerFailed(String),
}

/// Download every listed capture into `raw_pcap_dir/<directory>/` and merge them.
///
/// Merge-utility problems are outcomes rather than errors: the downloads stay in
/// place and the pipeline simply ends. The utility writes `<merged>.part`, which
/// only replaces an existing merged capture once it has succeeded.
pub async fn process_pcap(
    config: &DatasetConfig,
    downloader: &Downloader,
    confirm: &dyn Confirm,
    merger: &dyn CaptureMerger,
) -> Result<PcapOutcome> {
    info!("Fetching list of PCAP directories...");
    let directories = fetch_listing(downloader, &config.pcap_url, &ListingFilter::Directories).await?;
    info!("Found {} directories.", directories.len());

    let download = prepare_raw_dir(&config.raw_pcap_dir, confirm)?;

    let filter = ListingFilter::files(config.capture_extension.as_str());
    let mut transfers = Vec::new();
    for directory in directories.iter() {
        let Some(dir_name) = storable_name(directory) else {
            continue;
        };
        let dir_url = directories.resolve(directory)?;
        let captures = fetch_listing(downloader, &dir_url, &filter).await?;
        debug!("{dir_name}: {} captures", captures.len());

        for capture in captures.iter() {
            let Some(name) = storable_name(capture) else {
                continue;
            };
            plan(
                &mut transfers,
                Transfer {
                    url: captures.resolve(capture)?,
                    dest: config.raw_pcap_dir.join(&dir_name).join(&name),
                    label: format!("{dir_name}/{name}"),
                },
            );
        }
    }
    info!(
        "Found {} capture files across {} directories.",
        transfers.len(),
        directories.len()
    );

    if download {
        download_all(downloader, &transfers).await?;
        info!("PCAP files downloaded successfully.");
    }

    let inputs = present_inputs(&transfers);
    if inputs.is_empty() {
        warn!("No capture files available in {}; nothing to merge.", config.raw_pcap_dir.display());
        return Ok(PcapOutcome::NoInputs);
    }

    if !confirm_replace(&config.merged_pcap_path, confirm)? {
        return Ok(PcapOutcome::MergeDeclined);
    }

    info!("Merging {} capture files, this may take a while...", inputs.len());
    let partial = partial_path(&config.merged_pcap_path);
    let result = merger.merge(&inputs, &partial);
    if result.is_err() {
        remove_if_exists(&partial)?;
    }
    match result {
        Ok(()) => {
            std::fs::rename(&partial, &config.merged_pcap_path)?;
            info!("Merged capture saved to {}.", config.merged_pcap_path.display());
            Ok(PcapOutcome::Merged {
                inputs: inputs.len(),
                output: config.merged_pcap_path.clone(),
            })
        }
        Err(e @ MergeError::ToolNotFound { .. }) => {
            warn!("{e}; install Wireshark's mergecap or pass --merge-tool");
            Ok(PcapOutcome::MergerMissing(e.to_string()))
        }
        Err(e) => {
            warn!("Capture merge failed: {e}");
            Ok(PcapOutcome::MergerFailed(e.to_string()))
        }
    }
}
