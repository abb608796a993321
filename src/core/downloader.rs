//! Core download functionality for ciciot-dl
//!
//! Fetches directory-index pages and streams dataset files to disk. Every request
//! is awaited in turn; nothing here runs concurrently.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::core::config::DatasetConfig;
use crate::core::error::{Error, Result};
use crate::core::stream::{create_http_stream, DownloadOptions, ProgressCallback, ProgressFactory};

/// Execute an operation, retrying network errors with exponential backoff
async fn retry_on_network_error<F, Fut, T>(max_retries: u32, base_delay: Duration, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(Error::NetworkError(msg)) if attempt < max_retries => {
                attempt += 1;
                let delay = backoff_delay(base_delay, attempt);
                warn!("Network error (attempt {attempt}): {msg}. Retrying in {delay:?}...");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// HTTP client bound to one dataset configuration
pub struct Downloader {
    client: Client,
    options: DownloadOptions,
}

impl Downloader {
    /// Create a downloader whose limits come from `config`
    pub fn new(config: &DatasetConfig) -> Result<Self> {
        Self::with_options(config, DownloadOptions::from_config(config))
    }

    /// Create a downloader with explicit streaming options
    pub fn with_options(config: &DatasetConfig, options: DownloadOptions) -> Result<Self> {
        if options.buffer_size == 0 {
            return Err(Error::InvalidInput("buffer size must be greater than zero".to_string()));
        }
        let client = ClientBuilder::new()
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(config.connect_timeout)
            .user_agent(format!("ciciot-dl/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, options })
    }

    /// Report per-file transfer progress through `factory`
    pub fn with_progress(mut self, factory: ProgressFactory) -> Self {
        self.options.progress = Some(factory);
        self
    }

    /// GET a small text resource such as a directory-index page
    pub async fn fetch_text(&self, url: &Url) -> Result<String> {
        retry_on_network_error(self.options.max_retries, self.options.retry_delay, || async {
            debug!("GET {url}");
            let response = self
                .client
                .get(url.clone())
                .timeout(self.options.request_timeout)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(http_status_error(url, status));
            }
            Ok(response.text().await?)
        })
        .await
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// A failed transfer leaves whatever was written so far at `dest`.
    pub async fn download_to_file(&self, url: &Url, dest: &Path, label: &str) -> Result<u64> {
        debug!("GET {url} -> {}", dest.display());
        let request = self.client.get(url.clone()).send();
        let response = tokio::time::timeout(self.options.read_timeout, request)
            .await
            .map_err(|_| stalled(url, self.options.read_timeout))??;

        let status = response.status();
        if !status.is_success() {
            return Err(http_status_error(url, status));
        }

        // Only used for progress display
        let total_size = response
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        self.write_to_file(url, create_http_stream(response), dest, total_size, label)
            .await
    }

    /// Create `dest` and fill it from `reader`; on failure the bytes received so far are kept
    async fn write_to_file<R>(
        &self,
        url: &Url,
        reader: R,
        dest: &Path,
        total_size: u64,
        label: &str,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(dest).await?;

        let progress = self.options.progress.as_ref().map(|factory| factory(label));
        let result = self
            .stream_to_writer(url, reader, &mut file, total_size, progress.as_ref())
            .await;
        file.flush().await?;
        let downloaded = result?;

        if let Some(progress) = &progress {
            progress(downloaded, total_size.max(downloaded));
        }
        Ok(downloaded)
    }

    /// Copy `reader` to `writer` in `buffer_size` chunks, bounding each read by the read timeout
    async fn stream_to_writer<R, W>(
        &self,
        url: &Url,
        mut reader: R,
        writer: &mut W,
        total_size: u64,
        progress: Option<&ProgressCallback>,
    ) -> Result<u64>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buffer = vec![0u8; self.options.buffer_size];
        let mut downloaded = 0u64;

        loop {
            let bytes_read = tokio::time::timeout(self.options.read_timeout, reader.read(&mut buffer))
                .await
                .map_err(|_| stalled(url, self.options.read_timeout))?
                .map_err(|e| Error::NetworkError(format!("Stream read error: {e}")))?;

            if bytes_read == 0 {
                break;
            }

            writer.write_all(&buffer[..bytes_read]).await?;
            downloaded += bytes_read as u64;

            if let Some(progress) = progress {
                progress(downloaded, total_size);
            }
        }

        Ok(downloaded)
    }
}

fn stalled(url: &Url, after: Duration) -> Error {
    Error::NetworkError(format!("No data received from {url} for {after:?}"))
}

/// Create an HTTP error that names the URL, with a hint for missing resources
fn http_status_error(url: &Url, status: StatusCode) -> Error {
    if status == StatusCode::NOT_FOUND {
        Error::HttpError(format!(
            "Not found ({status}): {url}. Check that the dataset is still published at this location"
        ))
    } else {
        Error::HttpError(format!("Request failed ({status}): {url}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_downloader(options: impl FnOnce(&mut DownloadOptions)) -> Downloader {
        let config = DatasetConfig::default();
        let mut opts = DownloadOptions::from_config(&config);
        options(&mut opts);
        Downloader::with_options(&config, opts).unwrap()
    }

    #[tokio::test]
    async fn test_download_writes_body_and_reports_progress() {
        let mock_server = MockServer::start().await;
        let test_data = b"A".repeat(10 * 1024);

        Mock::given(method("GET"))
            .and(path("/CSV/part-00000.csv"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(test_data.clone(), "text/csv"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let calls: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
        let labels: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let factory: ProgressFactory = {
            let calls = Arc::clone(&calls);
            let labels = Arc::clone(&labels);
            Arc::new(move |label: &str| -> ProgressCallback {
                labels.lock().unwrap().push(label.to_string());
                let calls = Arc::clone(&calls);
                Arc::new(move |done: u64, total: u64| calls.lock().unwrap().push((done, total)))
            })
        };
        let downloader = test_downloader(|o| o.buffer_size = 1024).with_progress(factory);

        let dir = tempdir().unwrap();
        let dest = dir.path().join("nested").join("part-00000.csv");
        let url = Url::parse(&format!("{}/CSV/part-00000.csv", mock_server.uri())).unwrap();

        let written = downloader.download_to_file(&url, &dest, "part-00000.csv").await.unwrap();

        assert_eq!(written, test_data.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), test_data);
        assert_eq!(labels.lock().unwrap().as_slice(), ["part-00000.csv"]);

        let calls = calls.lock().unwrap();
        let (last_done, last_total) = *calls.last().unwrap();
        assert_eq!(last_done, test_data.len() as u64);
        assert_eq!(last_total, test_data.len() as u64);
        assert!(calls.windows(2).all(|w| w[0].0 <= w[1].0), "progress must be cumulative");
    }

    #[tokio::test]
    async fn test_download_missing_file_is_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let downloader = test_downloader(|_| {});
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing.pcap");
        let url = Url::parse(&format!("{}/missing.pcap", mock_server.uri())).unwrap();

        let result = downloader.download_to_file(&url, &dest, "missing.pcap").await;
        match result {
            Err(Error::HttpError(msg)) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("Expected HttpError, got {other:?}"),
        }
        assert!(!dest.exists(), "no file is created before the status check");
    }

    #[tokio::test]
    async fn test_download_stall_is_network_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let downloader = test_downloader(|o| o.read_timeout = Duration::from_millis(100));
        let dir = tempdir().unwrap();
        let url = Url::parse(&format!("{}/slow.pcap", mock_server.uri())).unwrap();

        let result = downloader
            .download_to_file(&url, &dir.path().join("slow.pcap"), "slow.pcap")
            .await;
        assert!(matches!(result, Err(Error::NetworkError(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_fetch_text_returns_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PCAP/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>index</html>"))
            .mount(&mock_server)
            .await;

        let downloader = test_downloader(|_| {});
        let url = Url::parse(&format!("{}/PCAP/", mock_server.uri())).unwrap();
        assert_eq!(downloader.fetch_text(&url).await.unwrap(), "<html>index</html>");
    }

    #[tokio::test]
    async fn test_fetch_text_server_error_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let downloader = test_downloader(|o| {
            o.max_retries = 3;
            o.retry_delay = Duration::from_millis(1);
        });
        let url = Url::parse(&format!("{}/CSV/", mock_server.uri())).unwrap();
        assert!(matches!(downloader.fetch_text(&url).await, Err(Error::HttpError(_))));
    }

    #[tokio::test]
    async fn test_retry_exponential_backoff() {
        use std::time::Instant;

        let start_time = Instant::now();
        let call_count = Arc::new(AtomicUsize::new(0));

        let result = retry_on_network_error(3, Duration::from_millis(50), || {
            let count_clone = Arc::clone(&call_count);
            async move {
                let call_num = count_clone.fetch_add(1, Ordering::SeqCst) + 1;
                if call_num <= 2 {
                    Err(Error::NetworkError("Simulated network failure".to_string()))
                } else {
                    Ok("success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        // 50ms + 100ms
        assert!(start_time.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let call_count = Arc::new(AtomicUsize::new(0));

        let result: Result<()> = retry_on_network_error(0, Duration::from_millis(1), || {
            let count_clone = Arc::clone(&call_count);
            async move {
                count_clone.fetch_add(1, Ordering::SeqCst);
                Err(Error::NetworkError("down".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(Error::NetworkError(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    /// Yields `data`, then fails the next read
    struct FailingReader {
        data: std::io::Cursor<Vec<u8>>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            if self.data.position() < self.data.get_ref().len() as u64 {
                return std::pin::Pin::new(&mut self.data).poll_read(cx, buf);
            }
            std::task::Poll::Ready(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            )))
        }
    }

    #[tokio::test]
    async fn test_interrupted_transfer_keeps_partial_file() {
        let downloader = test_downloader(|o| o.buffer_size = 256);
        let dir = tempdir().unwrap();
        let dest = dir.path().join("raw").join("BenignTraffic.pcap");
        let url = Url::parse("http://example.com/PCAP/Benign/BenignTraffic.pcap").unwrap();
        let received = b"P".repeat(1000);
        let reader = FailingReader { data: std::io::Cursor::new(received.clone()) };

        let result = downloader
            .write_to_file(&url, reader, &dest, 4096, "BenignTraffic.pcap")
            .await;

        match result {
            Err(Error::NetworkError(msg)) => assert!(msg.contains("connection reset"), "{msg}"),
            other => panic!("Expected NetworkError, got {other:?}"),
        }
        assert_eq!(std::fs::read(&dest).unwrap(), received);
    }

    #[test]
    fn test_backoff_delay_saturates() {
        let base = Duration::from_millis(50);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(50));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 33), base.saturating_mul(u32::MAX));
        assert_eq!(backoff_delay(base, u32::MAX), base.saturating_mul(u32::MAX));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = DatasetConfig::default();
        let options = DownloadOptions { buffer_size: 0, ..DownloadOptions::from_config(&config) };
        assert!(matches!(
            Downloader::with_options(&config, options),
            Err(Error::InvalidInput(_))
        ));
    }
}
