pub mod archive;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod orchestrate;
pub mod parse;
pub mod pipeline;
pub mod session;

pub use archive::{ARCHIVE_MIME, Archive, DEFAULT_ARCHIVE_NAME, build_archive, entry_name};
pub use error::{PluckError, Result};
pub use extract::{Candidate, ExtractConfig, candidates_from_urls, extract_image_urls, extract_images};
pub use fetch::{DEFAULT_USER_AGENT, FetchConfig, Fetcher, HttpFetcher, validate_source_url};
pub use fetch::{fetch_file, fetch_stdin};
pub use normalize::normalize_image_url;
pub use orchestrate::{DEFAULT_CONCURRENCY, FetchResult, Progress, count_hits, fetch_concurrent, fetch_sequential};
pub use parse::Document;
pub use pipeline::{DEFAULT_HOST_PATTERN, DEFAULT_PAGE_SIZE, FetchMode, Pluck, PluckConfig, PluckConfigBuilder};
pub use session::{Listener, PageCursor, Phase, SelectionSet, Session, SessionEvent};
