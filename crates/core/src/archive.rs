//! Zip packaging of fetched images.

use std::io::{Cursor, Write};
use std::path::Path;

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::Result;
use crate::orchestrate::FetchResult;

/// Suggested download filename for the archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "wechat_images.zip";

/// MIME type offered alongside the archive bytes.
pub const ARCHIVE_MIME: &str = "application/zip";

/// Entry name for the `n`-th successful image (1-based).
pub fn entry_name(n: usize) -> String {
    format!("image_{}.jpg", n)
}

/// A finished in-memory zip archive.
#[derive(Debug, Clone)]
pub struct Archive {
    bytes: Vec<u8>,
    entry_count: usize,
    attempted: usize,
    file_name: String,
}

impl Archive {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of images stored.
    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Number of fetch results the archive was built from.
    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.entry_count
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &'static str {
        ARCHIVE_MIME
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Writes the archive bytes to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Packs every hit of `results` into a deflate-compressed zip.
///
/// Hits are numbered densely in input order, so `[hit, miss, hit]` yields
/// `image_1.jpg` and `image_2.jpg`. Misses leave no entry. An all-miss input
/// still produces a valid, empty archive.
pub fn build_archive(results: &[FetchResult], file_name: &str) -> Result<Archive> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entry_count = 0usize;
    for payload in results.iter().filter_map(|r| r.payload.as_deref()) {
        entry_count += 1;
        zip.start_file(entry_name(entry_count), options)?;
        zip.write_all(payload)?;
    }

    let bytes = zip.finish()?.into_inner();
    info!(entries = entry_count, attempted = results.len(), size = bytes.len(), "archive built");

    Ok(Archive { bytes, entry_count, attempted: results.len(), file_name: file_name.to_string() })
}
