//! Content fetching from URLs, files, and stdin.
//!
//! This module provides the [`Fetcher`] trait used by the pipeline to
//! retrieve the source document and each image, its HTTP implementation
//! [`HttpFetcher`], and helpers for reading a saved document from disk or
//! standard input.

use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;
use url::Url;

use crate::{PluckError, Result};

/// Desktop browser identification; the origin serves stripped markup to unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Document request timeout in seconds.
    pub document_timeout: u64,
    /// Per-image request timeout in seconds.
    pub image_timeout: u64,
    /// User-Agent sent with every request.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { document_timeout: 10, image_timeout: 5, user_agent: DEFAULT_USER_AGENT.to_string() }
    }
}

/// Retrieves the source document and image payloads.
///
/// Each call is a single attempt with no retries. Implementations must be
/// shareable across tasks because the orchestrator fetches images in
/// parallel.
pub trait Fetcher: Send + Sync {
    /// Fetches the source document as text.
    fn fetch_document(&self, url: &str) -> impl Future<Output = Result<String>> + Send;

    /// Fetches one image and returns its raw bytes.
    ///
    /// Failures are reported as [`PluckError::ImageFetch`] or
    /// [`PluckError::Timeout`] carrying the requested URL.
    fn fetch_image(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Builds a client sending the configured User-Agent on every request.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| PluckError::ConfigError(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_document(&self, url: &str) -> Result<String> {
        let parsed_url = Url::parse(url).map_err(|e| PluckError::InvalidUrl(e.to_string()))?;
        let timeout = self.config.document_timeout;

        debug!(url, timeout, "fetching document");
        let response = self
            .client
            .get(parsed_url)
            .timeout(Duration::from_secs(timeout))
            .header(ACCEPT, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| document_error(url, timeout, e))?;

        response.text().await.map_err(|e| document_error(url, timeout, e))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let timeout = self.config.image_timeout;

        let response = self
            .client
            .get(url)
            .timeout(Duration::from_secs(timeout))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| image_error(url, timeout, e))?;

        let bytes = response.bytes().await.map_err(|e| image_error(url, timeout, e))?;
        Ok(bytes.to_vec())
    }
}

fn document_error(url: &str, timeout: u64, err: reqwest::Error) -> PluckError {
    if err.is_timeout() {
        PluckError::Timeout { url: url.to_string(), timeout }
    } else {
        PluckError::DocumentFetch { url: url.to_string(), reason: err.to_string() }
    }
}

fn image_error(url: &str, timeout: u64, err: reqwest::Error) -> PluckError {
    if err.is_timeout() {
        PluckError::Timeout { url: url.to_string(), timeout }
    } else {
        PluckError::ImageFetch { url: url.to_string(), reason: err.to_string() }
    }
}

/// Checks that `url` is non-empty and contains the expected host substring.
///
/// The host check is a case-sensitive substring match.
pub fn validate_source_url(url: &str, host_pattern: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(PluckError::InvalidUrl("no URL given".to_string()));
    }
    if !url.contains(host_pattern) {
        return Err(PluckError::HostMismatch { url: url.to_string(), expected: host_pattern.to_string() });
    }
    Ok(())
}

/// Reads HTML content from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(PluckError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(PluckError::from)
    }
}

/// Reads HTML content from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(PluckError::from)?;

    Ok(buffer)
}
