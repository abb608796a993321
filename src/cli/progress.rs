//! CLI-specific progress handling for ciciot-dl
//!
//! Provides progress bar implementation for the command-line interface.

use std::sync::Arc;

use ciciot_dl::{ProgressCallback, ProgressFactory};
use indicatif::{ProgressBar, ProgressStyle};

/// Creates a progress bar for CLI display with enhanced information
pub fn create_progress_bar(total_size: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec} ETA: {eta}")
            .expect("Failed to create progress style")
            .progress_chars("#>-")
    );
    pb
}

/// Progress manager handing out one bar per download
pub struct ProgressManager {
    hidden: bool,
}

impl ProgressManager {
    /// Create a new progress manager; `hidden` suppresses drawing (e.g. when stderr is not a terminal)
    pub fn new(hidden: bool) -> Self {
        Self { hidden }
    }

    /// A fresh bar for one transfer, labelled with `label`
    pub fn bar(&self, label: &str) -> ProgressBar {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            create_progress_bar(0)
        };
        pb.set_message(label.to_string());
        pb
    }

    /// Callback factory for [`ciciot_dl::Downloader::with_progress`]
    pub fn factory(self) -> ProgressFactory {
        Arc::new(move |label: &str| -> ProgressCallback {
            let pb = self.bar(label);
            Arc::new(move |downloaded: u64, total: u64| {
                if total > 0 && pb.length().unwrap_or(0) != total {
                    pb.set_length(total);
                }
                pb.set_position(downloaded);
                if total > 0 && downloaded >= total {
                    pb.finish();
                }
            })
        })
    }
}
