//! Dataset configuration for ciciot-dl
//!
//! Holds the remote index locations, local layout and network limits that every
//! pipeline receives explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::core::error::{Error, Result};

/// Default remote index of the merged CSV flow records
pub const DEFAULT_CSV_URL: &str =
    "http://cicresearch.ca/IOTDataset/CIC_IOT_Dataset2023/Dataset/CSV/MERGED_CSV/";

/// Default remote index of the packet-capture directories
pub const DEFAULT_PCAP_URL: &str =
    "http://cicresearch.ca/IOTDataset/CIC_IOT_Dataset2023/Dataset/PCAP/";

/// Configuration for dataset acquisition and consolidation
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    /// Directory index listing the CSV files
    pub csv_url: Url,

    /// Directory index listing one subdirectory per capture group
    pub pcap_url: Url,

    /// Where raw CSV downloads are stored
    pub raw_csv_dir: PathBuf,

    /// The single merged CSV output
    pub merged_csv_path: PathBuf,

    /// Where raw captures are stored, one subdirectory per remote directory
    pub raw_pcap_dir: PathBuf,

    /// The single merged capture output
    pub merged_pcap_path: PathBuf,

    pub csv_extension: String,
    pub capture_extension: String,

    /// Executable invoked as `<tool> -w <output> <inputs>...`
    pub merge_tool: String,

    pub connect_timeout: Duration,

    /// Overall timeout for index page requests
    pub request_timeout: Duration,

    /// Longest allowed silence between body chunks while downloading
    pub read_timeout: Duration,

    /// Buffer size for streaming downloads to disk
    pub chunk_size: usize,

    /// Extra attempts for index page requests failing with network errors
    pub listing_retries: u32,

    /// Base delay for exponential backoff between listing attempts
    pub retry_delay: Duration,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        let data = Path::new(".").join("data");
        Self {
            csv_url: Url::parse(DEFAULT_CSV_URL).expect("default CSV URL is valid"),
            pcap_url: Url::parse(DEFAULT_PCAP_URL).expect("default PCAP URL is valid"),
            raw_csv_dir: data.join("raw").join("CIC_IOT_CSV_Dataset"),
            merged_csv_path: data.join("processed").join("CIC_IOT_CSV_Dataset.csv"),
            raw_pcap_dir: data.join("raw").join("CIC_IOT_PCAP_Dataset"),
            merged_pcap_path: data.join("processed").join("CIC_IOT_PCAP_Dataset.pcap"),
            csv_extension: ".csv".to_string(),
            capture_extension: ".pcap".to_string(),
            merge_tool: "mergecap".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            chunk_size: 64 * 1024, // 64KB
            listing_retries: 0,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl DatasetConfig {
    /// Default configuration with the local layout placed under `root/data`
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        Self::default().with_data_root(root)
    }

    /// Relocate the four local paths under `root/data`
    pub fn with_data_root(mut self, root: impl AsRef<Path>) -> Self {
        let data = root.as_ref().join("data");
        self.raw_csv_dir = data.join("raw").join("CIC_IOT_CSV_Dataset");
        self.merged_csv_path = data.join("processed").join("CIC_IOT_CSV_Dataset.csv");
        self.raw_pcap_dir = data.join("raw").join("CIC_IOT_PCAP_Dataset");
        self.merged_pcap_path = data.join("processed").join("CIC_IOT_PCAP_Dataset.pcap");
        self
    }

    /// Check values that would otherwise fail deep inside a pipeline
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidInput("chunk size must be greater than zero".to_string()));
        }
        for (name, ext) in [("CSV", &self.csv_extension), ("capture", &self.capture_extension)] {
            if ext.is_empty() {
                return Err(Error::InvalidInput(format!("{name} extension must not be empty")));
            }
        }
        if self.merge_tool.trim().is_empty() {
            return Err(Error::InvalidInput("merge tool must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parse a directory-index URL, appending the trailing slash relative hrefs need
pub fn parse_index_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("'{raw}' cannot be used as an index base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = DatasetConfig::default();
        assert_eq!(config.csv_url.as_str(), DEFAULT_CSV_URL);
        assert_eq!(config.pcap_url.as_str(), DEFAULT_PCAP_URL);
        assert!(config.raw_csv_dir.ends_with("data/raw/CIC_IOT_CSV_Dataset"));
        assert!(config.merged_csv_path.ends_with("data/processed/CIC_IOT_CSV_Dataset.csv"));
        assert_eq!(config.merge_tool, "mergecap");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rooted_at_relocates_all_paths() {
        let config = DatasetConfig::rooted_at("/tmp/ciciot");
        for path in [
            &config.raw_csv_dir,
            &config.merged_csv_path,
            &config.raw_pcap_dir,
            &config.merged_pcap_path,
        ] {
            assert!(path.starts_with("/tmp/ciciot/data"), "{path:?}");
        }
    }

    #[test]
    fn test_parse_index_url_appends_slash() {
        let url = parse_index_url("http://example.com/Dataset/PCAP").unwrap();
        assert_eq!(url.as_str(), "http://example.com/Dataset/PCAP/");

        let url = parse_index_url("http://example.com/Dataset/CSV/").unwrap();
        assert_eq!(url.as_str(), "http://example.com/Dataset/CSV/");
    }

    #[test]
    fn test_parse_index_url_rejects_garbage() {
        assert!(matches!(parse_index_url("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(parse_index_url("mailto:someone@example.com"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let config = DatasetConfig { chunk_size: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidInput(_))));
    }
}
