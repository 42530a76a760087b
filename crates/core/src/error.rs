//! Error types for Pluck operations.
//!
//! This module defines the main error type [`PluckError`] which covers input
//! validation, document retrieval, markup parsing, per-image fetching,
//! session guards and archive assembly.
//!
//! Errors fall into two groups. Document-level errors (validation, document
//! fetch, parse) halt the pipeline before any archive exists. Item-level
//! errors ([`PluckError::ImageFetch`] and per-image [`PluckError::Timeout`])
//! are absorbed by the orchestrator and only ever show up as a miss.
//!
//! # Example
//!
//! ```rust
//! use pluck_core::{PluckError, Result};
//!
//! fn require_images(urls: Vec<String>) -> Result<Vec<String>> {
//!     if urls.is_empty() {
//!         return Err(PluckError::NoImages);
//!     }
//!     Ok(urls)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extraction and packaging operations.
#[derive(Error, Debug)]
pub enum PluckError {
    /// Empty or unparsable input URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The input URL does not point at the expected source site.
    #[error("URL {url} does not look like an article from {expected}")]
    HostMismatch { url: String, expected: String },

    /// The source document could not be retrieved.
    ///
    /// Covers network failures and non-success status codes.
    #[error("Failed to fetch document {url}: {reason}")]
    DocumentFetch { url: String, reason: String },

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request to {url} timed out after {timeout} seconds")]
    Timeout { url: String, timeout: u64 },

    /// The document was retrieved but is not markup.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The document parsed fine but holds no usable images.
    ///
    /// This is a soft outcome: the article may have been deleted or the
    /// content may be unavailable to anonymous clients.
    #[error("No images found; the article may have been removed or is unavailable")]
    NoImages,

    /// A single image could not be retrieved.
    #[error("Failed to fetch image {url}: {reason}")]
    ImageFetch { url: String, reason: String },

    /// Packaging was requested while every candidate is excluded.
    #[error("No images selected; select at least one image before packaging")]
    NothingSelected,

    /// A selection operation named an ordinal outside the candidate list.
    #[error("No candidate image #{0}")]
    NoSuchItem(usize),

    /// A session operation was invoked in a phase that does not allow it.
    #[error("Cannot {operation} while the session is {phase}")]
    InvalidPhase { operation: &'static str, phase: String },

    /// Zip writer failure.
    #[error("Failed to build archive: {0}")]
    ArchiveError(String),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client construction errors from reqwest.
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File and stream I/O errors.
    #[error("I/O error: {0}")]
    WriteError(#[from] std::io::Error),
}

impl PluckError {
    /// True for input validation failures that never leave the caller's hands.
    pub fn is_validation(&self) -> bool {
        matches!(self, PluckError::InvalidUrl(_) | PluckError::HostMismatch { .. })
    }

    /// True for errors that stop the pipeline before any image is fetched.
    pub fn is_document_level(&self) -> bool {
        self.is_validation()
            || matches!(
                self,
                PluckError::DocumentFetch { .. }
                    | PluckError::Timeout { .. }
                    | PluckError::HtmlParseError(_)
                    | PluckError::FileNotFound(_)
            )
    }

    /// True for outcomes that should be shown as a notice rather than a failure.
    pub fn is_soft(&self) -> bool {
        matches!(self, PluckError::NoImages | PluckError::NothingSelected)
    }
}

impl From<zip::result::ZipError> for PluckError {
    fn from(err: zip::result::ZipError) -> Self {
        PluckError::ArchiveError(err.to_string())
    }
}

/// Result type alias for PluckError.
pub type Result<T> = std::result::Result<T, PluckError>;
