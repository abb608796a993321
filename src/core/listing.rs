//! Directory-index listing for ciciot-dl
//!
//! Scrapes autoindex-style HTML pages for file and subdirectory links.

use log::debug;
use percent_encoding::percent_decode_str;
use scraper::{Html, Selector};
use url::Url;

use crate::core::downloader::Downloader;
use crate::core::error::{Error, Result};

/// Which anchors of an index page to keep
#[derive(Debug, Clone, PartialEq)]
pub enum ListingFilter {
    /// hrefs ending with `extension`
    Files { extension: String },
    /// Child directory links: trailing slash, relative, beneath the page itself
    Directories,
}

impl ListingFilter {
    pub fn files(extension: impl Into<String>) -> Self {
        ListingFilter::Files { extension: extension.into() }
    }
}

/// The ordered hrefs discovered on one index page
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteListing {
    pub base: Url,
    pub entries: Vec<String>,
}

impl RemoteListing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Absolute URL of an entry
    pub fn resolve(&self, entry: &str) -> Result<Url> {
        Ok(self.base.join(entry)?)
    }
}

/// Fetch `base` and return the anchors matching `filter`
pub async fn fetch_listing(downloader: &Downloader, base: &Url, filter: &ListingFilter) -> Result<RemoteListing> {
    let html = downloader.fetch_text(base).await?;
    let entries = parse_listing(&html, base, filter);
    debug!("{} entries matched {:?} at {}", entries.len(), filter, base);
    Ok(RemoteListing {
        base: base.clone(),
        entries,
    })
}

/// Extract the `href` values of all anchors in `html` that pass `filter`, in document order
pub fn parse_listing(html: &str, base: &Url, filter: &ListingFilter) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a[href]").expect("static selector is valid");

    document
        .select(&anchors)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter(|href| match filter {
            ListingFilter::Files { extension } => href.ends_with(extension.as_str()),
            ListingFilter::Directories => is_child_directory(href, base),
        })
        .map(str::to_string)
        .collect()
}

fn is_child_directory(href: &str, base: &Url) -> bool {
    if !href.ends_with('/') || href.starts_with('?') || href.starts_with('/') {
        return false;
    }
    // Absolute URLs and anything resolving to the page itself or above it
    if Url::parse(href).is_ok() {
        return false;
    }
    match base.join(href) {
        Ok(resolved) => resolved != *base && resolved.as_str().starts_with(base.as_str()),
        Err(_) => false,
    }
}

/// Local file or directory name for an entry: trailing slash removed and percent-decoded.
///
/// Names that could escape the destination directory are rejected.
pub fn local_name(entry: &str) -> Result<String> {
    let trimmed = entry.trim_end_matches('/');
    let decoded = percent_decode_str(trimmed)
        .decode_utf8()
        .map_err(|e| Error::InvalidInput(format!("'{entry}' is not valid UTF-8 once decoded: {e}")))?;

    if decoded.is_empty() || decoded == "." || decoded == ".." || decoded.contains(['/', '\\']) {
        return Err(Error::InvalidInput(format!(
            "'{entry}' cannot be stored as a local file name"
        )));
    }
    Ok(decoded.into_owned())
}
