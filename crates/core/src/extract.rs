//! Content image discovery.
//!
//! Finds the article's content region by id, falls back to the whole
//! document when the region is missing, and collects the lazy-load source of
//! every `<img>` inside it in document order.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;
use crate::parse::Document;

/// Configuration for image extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// `id` of the element holding the article body
    pub content_id: String,
    /// Attribute carrying the real image URL on lazily loaded images
    pub lazy_attr: String,
    /// Minimum length for a lazy source to count (0 disables the check)
    pub min_src_len: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { content_id: "js_content".to_string(), lazy_attr: "data-src".to_string(), min_src_len: 0 }
    }
}

/// A discovered image, keyed by its position in discovery order.
///
/// Ordinals are 0-based, unique and stable for one discovery. URLs are not
/// de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub ordinal: usize,
    pub url: String,
}

impl Candidate {
    pub fn new(ordinal: usize, url: impl Into<String>) -> Self {
        Self { ordinal, url: url.into() }
    }
}

/// Builds candidates from a list of URLs, numbering them in order.
pub fn candidates_from_urls<I, S>(urls: I) -> Vec<Candidate>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    urls.into_iter().enumerate().map(|(i, url)| Candidate::new(i, url)).collect()
}

/// Collects candidate images from a parsed document.
///
/// An empty result is not an error here; callers decide how to surface it.
pub fn extract_images(doc: &Document, config: &ExtractConfig) -> Result<Vec<Candidate>> {
    let region = match doc.find_by_id(&config.content_id) {
        Some(region) => region,
        None => {
            debug!(content_id = %config.content_id, "content region not found, scanning whole document");
            doc.root()
        }
    };

    let mut urls = Vec::new();
    for img in region.select("img")? {
        let Some(src) = img.attr(&config.lazy_attr) else {
            continue;
        };
        if src.is_empty() || src.chars().count() < config.min_src_len {
            continue;
        }
        urls.push(src.to_string());
    }

    debug!(count = urls.len(), "extracted image candidates");
    Ok(candidates_from_urls(urls))
}

/// Parses `html` and collects candidate images.
///
/// # Errors
///
/// Returns [`crate::PluckError::HtmlParseError`] when the input is not markup.
pub fn extract_image_urls(html: &str, config: &ExtractConfig) -> Result<Vec<Candidate>> {
    let doc = Document::parse(html)?;
    extract_images(&doc, config)
}
