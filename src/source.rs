//! Content acquisition - turns a request's data source into text
//!
//! A new collection is seeded from exactly one of:
//! - inline text
//! - a remote URL (http/https), fetched with a timeout and size limit
//! - a local file path, read with the same limits

use std::path::{Path, PathBuf};
use std::time::Duration;
use async_trait::async_trait;
use crate::{Error, Result};

/// Tag name used when neither a tag nor a URL/file is available to name one
pub const DEFAULT_TAG: &str = "default";

/// Where the seed content of a collection comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    Text(String),
    Url(String),
    File(PathBuf),
}

impl ContentSource {
    /// Select the single source among optional request fields.
    ///
    /// Blank values count as absent. Zero or several sources are a
    /// [`Error::Validation`].
    pub fn from_parts(url: Option<String>, text: Option<String>, file: Option<String>) -> Result<Self> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let mut sources = Vec::with_capacity(1);
        if let Some(url) = present(url) {
            sources.push(Self::Url(url));
        }
        if let Some(text) = present(text) {
            sources.push(Self::Text(text));
        }
        if let Some(file) = present(file) {
            sources.push(Self::File(PathBuf::from(file)));
        }

        match sources.len() {
            0 => Err(Error::Validation(
                "missing data source: one of url, text or file is required".to_string(),
            )),
            1 => Ok(sources.remove(0)),
            _ => Err(Error::Validation(
                "ambiguous data source: provide only one of url, text or file".to_string(),
            )),
        }
    }

    /// Tag name to use when the request does not name one
    pub fn default_tag(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::File(path) => path.display().to_string(),
            Self::Text(_) => DEFAULT_TAG.to_string(),
        }
    }
}

/// Resolves URLs and file paths into text
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the body of a remote URL
    async fn fetch_url(&self, url: &str) -> Result<String>;

    /// Read a local file
    async fn read_file(&self, path: &Path) -> Result<String>;

    /// Resolve any source into its text payload
    async fn acquire(&self, source: &ContentSource) -> Result<String> {
        match source {
            ContentSource::Text(text) => Ok(text.clone()),
            ContentSource::Url(url) => self.fetch_url(url).await,
            ContentSource::File(path) => self.read_file(path).await,
        }
    }
}

/// Default fetcher: reqwest for URLs, tokio::fs for files
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    fn too_large(&self, what: &str) -> Error {
        Error::Acquisition(format!("{} exceeds the {} byte limit", what, self.max_bytes))
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_url(&self, url: &str) -> Result<String> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Acquisition(format!("invalid URL {}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Acquisition(format!("unsupported URL scheme: {}", parsed.scheme())));
        }

        tracing::debug!(%url, "fetching content");
        let mut response = self
            .client
            .get(parsed)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Acquisition(format!("failed to fetch {}: {}", url, e)))?;

        if response.content_length().is_some_and(|len| len > self.max_bytes as u64) {
            return Err(self.too_large("response body"));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Acquisition(format!("failed to read body of {}: {}", url, e)))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large("response body"));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let read_err = |e: std::io::Error| {
            Error::Acquisition(format!("failed to read {}: {}", path.display(), e))
        };

        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        if !metadata.is_file() {
            return Err(Error::Acquisition(format!("{} is not a file", path.display())));
        }
        if metadata.len() > self.max_bytes as u64 {
            return Err(self.too_large("file"));
        }

        tracing::debug!(path = %path.display(), "reading content");
        tokio::time::timeout(self.timeout, tokio::fs::read_to_string(path))
            .await
            .map_err(|_| Error::Acquisition(format!("timed out reading {}", path.display())))?
            .map_err(read_err)
    }
}
