//! # ciciot-dl
//!
//! Acquires the CIC IoT 2023 network-traffic dataset from its public HTTP index
//! and consolidates it locally into one merged CSV table and one merged
//! packet-capture file.
//!
//! ```no_run
//! use ciciot_dl::{AssumeYes, DatasetConfig, Downloader};
//!
//! # async fn demo() -> ciciot_dl::Result<()> {
//! let config = DatasetConfig::rooted_at(".");
//! ciciot_dl::ensure_layout(&config)?;
//! let downloader = Downloader::new(&config)?;
//! let outcome = ciciot_dl::process_csv(&config, &downloader, &AssumeYes).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;

pub use crate::core::config::{parse_index_url, DatasetConfig};
pub use crate::core::confirm::{AssumeNo, AssumeYes, Confirm, StdinConfirm};
pub use crate::core::downloader::Downloader;
pub use crate::core::error::{Error, Result};
pub use crate::core::layout::ensure_layout;
pub use crate::core::listing::{fetch_listing, parse_listing, ListingFilter, RemoteListing};
pub use crate::core::merge::{CaptureMerger, MergeError, Mergecap};
pub use crate::core::stream::{DownloadOptions, ProgressCallback, ProgressFactory};
pub use crate::core::table::{merge_tables, MergeSummary, TableSource};
pub use crate::pipeline::{cleanup, process_csv, process_pcap, CleanupOutcome, CsvOutcome, PcapOutcome};
