//! Main extraction and packaging API.
//!
//! This module provides [`Pluck`], which ties validation, document retrieval,
//! image discovery, fetching and archive assembly together, and the
//! [`PluckConfig`] that drives it.
//!
//! # Example
//!
//! ```rust,no_run
//! use pluck_core::{Pluck, PluckConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> pluck_core::Result<()> {
//! let config = PluckConfig::builder().concurrency(4).build();
//! let pluck = Pluck::with_config(config)?;
//! let archive = pluck
//!     .run("https://mp.weixin.qq.com/s/abc", |p| eprintln!("{}/{}", p.completed, p.total))
//!     .await?;
//! archive.write_to(std::path::Path::new(archive.file_name()))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::archive::{Archive, DEFAULT_ARCHIVE_NAME, build_archive};
use crate::extract::{Candidate, ExtractConfig, extract_images};
use crate::fetch::{FetchConfig, Fetcher, HttpFetcher, validate_source_url};
use crate::orchestrate::{DEFAULT_CONCURRENCY, FetchResult, Progress, fetch_concurrent, fetch_sequential};
use crate::parse::Document;
use crate::{PluckError, Result};

/// Host substring every accepted source URL must contain.
pub const DEFAULT_HOST_PATTERN: &str = "mp.weixin.qq.com";

/// Candidates shown per page in a selection session.
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// How images are fetched during packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// One request at a time, progress in strict input order
    Sequential,
    /// Bounded worker pool
    #[default]
    Concurrent,
}

/// Configuration for a [`Pluck`] pipeline.
#[derive(Debug, Clone)]
pub struct PluckConfig {
    /// HTTP settings (default: 10s document, 5s image timeout, desktop Chrome UA).
    pub fetch: FetchConfig,

    /// Extraction settings (default: `#js_content`, `data-src`).
    pub extract: ExtractConfig,

    /// Parallel image fetches in concurrent mode (default: 8, 0 behaves as 1).
    pub concurrency: usize,

    /// Fetch mode (default: concurrent).
    pub mode: FetchMode,

    /// Selection page size (default: 12).
    pub page_size: usize,

    /// Required host substring (default: `mp.weixin.qq.com`).
    pub host_pattern: String,

    /// Suggested archive filename (default: `wechat_images.zip`).
    pub archive_name: String,
}

impl Default for PluckConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
            concurrency: DEFAULT_CONCURRENCY,
            mode: FetchMode::default(),
            page_size: DEFAULT_PAGE_SIZE,
            host_pattern: DEFAULT_HOST_PATTERN.to_string(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl PluckConfig {
    /// Creates a new builder for PluckConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pluck_core::{FetchMode, PluckConfig};
    ///
    /// let config = PluckConfig::builder().mode(FetchMode::Sequential).page_size(20).build();
    /// assert_eq!(config.page_size, 20);
    /// ```
    pub fn builder() -> PluckConfigBuilder {
        PluckConfigBuilder::new()
    }
}

/// Builder for PluckConfig.
pub struct PluckConfigBuilder {
    config: PluckConfig,
}

impl PluckConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: PluckConfig::default() }
    }

    pub fn document_timeout(mut self, secs: u64) -> Self {
        self.config.fetch.document_timeout = secs;
        self
    }

    pub fn image_timeout(mut self, secs: u64) -> Self {
        self.config.fetch.image_timeout = secs;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    pub fn content_id(mut self, value: impl Into<String>) -> Self {
        self.config.extract.content_id = value.into();
        self
    }

    pub fn lazy_attr(mut self, value: impl Into<String>) -> Self {
        self.config.extract.lazy_attr = value.into();
        self
    }

    pub fn min_src_len(mut self, value: usize) -> Self {
        self.config.extract.min_src_len = value;
        self
    }

    pub fn concurrency(mut self, value: usize) -> Self {
        self.config.concurrency = value;
        self
    }

    pub fn mode(mut self, value: FetchMode) -> Self {
        self.config.mode = value;
        self
    }

    /// Sets the page size; values below 1 are raised to 1.
    pub fn page_size(mut self, value: usize) -> Self {
        self.config.page_size = value.max(1);
        self
    }

    pub fn host_pattern(mut self, value: impl Into<String>) -> Self {
        self.config.host_pattern = value.into();
        self
    }

    pub fn archive_name(mut self, value: impl Into<String>) -> Self {
        self.config.archive_name = value.into();
        self
    }

    /// Builds the config.
    pub fn build(self) -> PluckConfig {
        self.config
    }
}

impl Default for PluckConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Extraction and packaging pipeline over a [`Fetcher`].
pub struct Pluck<F = HttpFetcher> {
    fetcher: Arc<F>,
    config: PluckConfig,
}

impl Pluck<HttpFetcher> {
    /// Creates a pipeline with default configuration and an HTTP fetcher.
    pub fn new() -> Result<Self> {
        Self::with_config(PluckConfig::default())
    }

    /// Creates a pipeline with an HTTP fetcher built from `config.fetch`.
    pub fn with_config(config: PluckConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.fetch.clone())?;
        Ok(Self::with_fetcher(fetcher, config))
    }
}

impl<F: Fetcher + 'static> Pluck<F> {
    /// Creates a pipeline over a custom fetcher.
    pub fn with_fetcher(fetcher: F, config: PluckConfig) -> Self {
        Self { fetcher: Arc::new(fetcher), config }
    }

    pub fn config(&self) -> &PluckConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Checks the URL against the configured host pattern.
    pub fn validate(&self, url: &str) -> Result<()> {
        validate_source_url(url, &self.config.host_pattern)
    }

    /// Extracts candidates from an already retrieved document.
    ///
    /// # Errors
    ///
    /// [`PluckError::HtmlParseError`] for non-markup input and
    /// [`PluckError::NoImages`] when nothing qualifies.
    pub fn extract(&self, html: &str) -> Result<Vec<Candidate>> {
        let doc = Document::parse(html)?;
        let candidates = extract_images(&doc, &self.config.extract)?;
        if candidates.is_empty() {
            return Err(PluckError::NoImages);
        }
        Ok(candidates)
    }

    /// Validates `url`, fetches the document and extracts candidates.
    pub async fn discover(&self, url: &str) -> Result<Vec<Candidate>> {
        self.validate(url)?;
        let html = self.fetcher.fetch_document(url.trim()).await?;
        let candidates = self.extract(&html)?;
        info!(url, count = candidates.len(), "discovered images");
        Ok(candidates)
    }

    /// Fetches `items` using the configured mode.
    pub async fn fetch_all<P: FnMut(Progress)>(&self, items: &[Candidate], on_progress: P) -> Vec<FetchResult> {
        match self.config.mode {
            FetchMode::Sequential => fetch_sequential(self.fetcher.as_ref(), items, on_progress).await,
            FetchMode::Concurrent => {
                fetch_concurrent(Arc::clone(&self.fetcher), items, self.config.concurrency, on_progress).await
            }
        }
    }

    /// Fetches `items` and packs the hits into an archive.
    ///
    /// Individual failures only reduce the entry count.
    pub async fn package<P: FnMut(Progress)>(&self, items: &[Candidate], on_progress: P) -> Result<Archive> {
        let results = self.fetch_all(items, on_progress).await;
        let archive = build_archive(&results, &self.config.archive_name)?;
        info!(
            entries = archive.entry_count(),
            failed = archive.failed(),
            "packaged images"
        );
        Ok(archive)
    }

    /// One-shot run: discover every image on the page and package all of them.
    pub async fn run<P: FnMut(Progress)>(&self, url: &str, on_progress: P) -> Result<Archive> {
        let candidates = self.discover(url).await?;
        self.package(&candidates, on_progress).await
    }
}
