//! CSV pipeline: list, download, clean and concatenate the flow-record tables

use log::{info, warn};

use crate::core::confirm::Confirm;
use crate::core::config::DatasetConfig;
use crate::core::downloader::Downloader;
use crate::core::error::Result;
use crate::core::listing::{fetch_listing, ListingFilter};
use crate::core::table::{merge_tables, MergeSummary, TableSource};

use super::{
    confirm_replace, download_all, plan, prepare_raw_dir, present_inputs, storable_name, Transfer,
};

/// How a CSV pipeline run ended
#[derive(Debug, Clone, PartialEq)]
pub enum CsvOutcome {
    /// A merged table was written
    Merged(MergeSummary),
    /// A merged table already existed and was kept
    MergeDeclined,
    /// None of the listed files are available locally
    NoInputs,
}

/// Download the listed CSV files and merge them into `config.merged_csv_path`.
///
/// Only the files named by the remote listing are merged; anything else lying in
/// the raw directory is ignored.
pub async fn process_csv(
    config: &DatasetConfig,
    downloader: &Downloader,
    confirm: &dyn Confirm,
) -> Result<CsvOutcome> {
    info!("Fetching list of CSV files from {}", config.csv_url);
    let filter = ListingFilter::files(config.csv_extension.as_str());
    let listing = fetch_listing(downloader, &config.csv_url, &filter).await?;
    info!("Found {} CSV files.", listing.len());

    let mut transfers = Vec::with_capacity(listing.len());
    for entry in listing.iter() {
        let Some(name) = storable_name(entry) else {
            continue;
        };
        plan(
            &mut transfers,
            Transfer {
                url: listing.resolve(entry)?,
                dest: config.raw_csv_dir.join(&name),
                label: name,
            },
        );
    }

    if prepare_raw_dir(&config.raw_csv_dir, confirm)? {
        download_all(downloader, &transfers).await?;
    }

    let inputs = present_inputs(&transfers);
    if inputs.is_empty() {
        warn!("No CSV files available in {}; nothing to merge.", config.raw_csv_dir.display());
        return Ok(CsvOutcome::NoInputs);
    }

    info!("Processing {} CSV files...", inputs.len());
    let sources = inputs
        .iter()
        .map(TableSource::open)
        .collect::<Result<Vec<_>>>()?;

    if !confirm_replace(&config.merged_csv_path, confirm)? {
        return Ok(CsvOutcome::MergeDeclined);
    }

    info!("Combining {} datasets, this may take a while...", sources.len());
    let summary = merge_tables(&sources, &config.merged_csv_path)?;
    Ok(CsvOutcome::Merged(summary))
}
