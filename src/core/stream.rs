//! Streaming primitives for ciciot-dl
//!
//! Wraps HTTP bodies as `AsyncRead` and carries the per-download options.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::TryStreamExt;
use tokio::io::{AsyncRead, ReadBuf};

use crate::core::config::DatasetConfig;

/// A response body exposed as a byte reader
pub enum DownloadStream {
    /// HTTP stream using reqwest
    Http(Box<dyn AsyncRead + Send + Unpin>),
}

impl AsyncRead for DownloadStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match &mut *self {
            DownloadStream::Http(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

/// Progress callback receiving `(downloaded, total)`; `total` is 0 when unknown
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Builds one progress callback per transfer, given a display label
pub type ProgressFactory = Arc<dyn Fn(&str) -> ProgressCallback + Send + Sync>;

/// Options for download operations
#[derive(Clone)]
pub struct DownloadOptions {
    /// Optional per-transfer progress reporting
    pub progress: Option<ProgressFactory>,

    /// Buffer size for streaming operations
    pub buffer_size: usize,

    /// Longest allowed wait for the next body chunk
    pub read_timeout: Duration,

    /// Overall timeout for small requests such as index pages
    pub request_timeout: Duration,

    /// Extra attempts for index page requests on network errors
    pub max_retries: u32,

    /// Base delay for exponential backoff
    pub retry_delay: Duration,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self::from_config(&DatasetConfig::default())
    }
}

impl DownloadOptions {
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self {
            progress: None,
            buffer_size: config.chunk_size,
            read_timeout: config.read_timeout,
            request_timeout: config.request_timeout,
            max_retries: config.listing_retries,
            retry_delay: config.retry_delay,
        }
    }
}

/// Creates a DownloadStream from an HTTP response
pub fn create_http_stream(response: reqwest::Response) -> DownloadStream {
    let stream = Box::new(tokio_util::io::StreamReader::new(
        response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e)),
    ));
    DownloadStream::Http(stream)
}
