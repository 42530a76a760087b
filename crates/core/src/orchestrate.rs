//! Sequential and concurrent image fetching.
//!
//! Both modes normalize each URL immediately before the request, report a
//! [`Progress`] after every terminal outcome, and return one [`FetchResult`]
//! per input item in input order. A failed fetch becomes a miss; it never
//! aborts the batch.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::extract::Candidate;
use crate::fetch::Fetcher;
use crate::normalize::normalize_image_url;

/// Default number of images fetched in parallel.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Completed over total count, reported once per finished item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion ratio in `[0.0, 1.0]`; an empty batch counts as done.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 { 1.0 } else { self.completed as f64 / self.total as f64 }
    }

    pub fn percent(&self) -> u8 {
        (self.fraction() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    pub fn is_done(&self) -> bool {
        self.completed >= self.total
    }
}

/// Terminal outcome for one dispatched candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// Ordinal of the candidate this result belongs to
    pub ordinal: usize,
    /// Normalized URL that was requested
    pub url: String,
    /// Image bytes, or `None` on a miss
    pub payload: Option<Vec<u8>>,
}

impl FetchResult {
    pub fn hit(ordinal: usize, url: impl Into<String>, payload: Vec<u8>) -> Self {
        Self { ordinal, url: url.into(), payload: Some(payload) }
    }

    pub fn miss(ordinal: usize, url: impl Into<String>) -> Self {
        Self { ordinal, url: url.into(), payload: None }
    }

    pub fn is_hit(&self) -> bool {
        self.payload.is_some()
    }
}

/// Number of hits in a result sequence.
pub fn count_hits(results: &[FetchResult]) -> usize {
    results.iter().filter(|r| r.is_hit()).count()
}

/// Fetches `items` one after another.
///
/// Progress is reported after each item in input order.
pub async fn fetch_sequential<F, P>(fetcher: &F, items: &[Candidate], mut on_progress: P) -> Vec<FetchResult>
where
    F: Fetcher,
    P: FnMut(Progress),
{
    let total = items.len();
    let mut results = Vec::with_capacity(total);

    for (i, item) in items.iter().enumerate() {
        let url = normalize_image_url(&item.url);
        let payload = match fetcher.fetch_image(&url).await {
            Ok(bytes) => {
                debug!(ordinal = item.ordinal, url = %url, size = bytes.len(), "image fetched");
                Some(bytes)
            }
            Err(e) => {
                warn!(ordinal = item.ordinal, error = %e, "image fetch failed");
                None
            }
        };
        results.push(FetchResult { ordinal: item.ordinal, url, payload });
        on_progress(Progress { completed: i + 1, total });
    }

    results
}

/// Fetches `items` on a bounded pool of at most `concurrency` tasks.
///
/// Completion order is unconstrained; each task writes into the slot of its
/// input position, so the returned vector is aligned with `items`. Progress
/// is aggregated by count. A panicking task leaves its slot as a miss.
pub async fn fetch_concurrent<F, P>(
    fetcher: Arc<F>, items: &[Candidate], concurrency: usize, mut on_progress: P,
) -> Vec<FetchResult>
where
    F: Fetcher + 'static,
    P: FnMut(Progress),
{
    let total = items.len();
    let width = concurrency.max(1);

    let mut results: Vec<FetchResult> = items
        .iter()
        .map(|item| FetchResult::miss(item.ordinal, normalize_image_url(&item.url)))
        .collect();

    let urls: Vec<String> = results.iter().map(|r| r.url.clone()).collect();
    let mut queue = urls.into_iter().enumerate();
    let mut set: JoinSet<(usize, Option<Vec<u8>>)> = JoinSet::new();
    let mut completed = 0usize;

    loop {
        while set.len() < width {
            let Some((slot, url)) = queue.next() else {
                break;
            };
            let worker = Arc::clone(&fetcher);
            set.spawn(async move {
                match worker.fetch_image(&url).await {
                    Ok(bytes) => (slot, Some(bytes)),
                    Err(e) => {
                        warn!(slot, error = %e, "image fetch failed");
                        (slot, None)
                    }
                }
            });
        }

        let Some(joined) = set.join_next().await else {
            break;
        };

        match joined {
            Ok((slot, payload)) => {
                if let Some(bytes) = &payload {
                    debug!(ordinal = results[slot].ordinal, size = bytes.len(), "image fetched");
                }
                results[slot].payload = payload;
            }
            Err(err) => {
                warn!(error = %err, "fetch worker failed");
            }
        }

        completed += 1;
        on_progress(Progress { completed, total });
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PluckError, Result};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves `bytes-of-<url>` unless the URL contains "fail"; sleeps per `delays`.
    #[derive(Default)]
    struct MockFetcher {
        delays: HashMap<String, u64>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Fetcher for MockFetcher {
        async fn fetch_document(&self, _url: &str) -> Result<String> {
            Ok(String::new())
        }

        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(ms) = self.delays.get(url) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if url.contains("fail") {
                Err(PluckError::ImageFetch { url: url.to_string(), reason: "simulated".to_string() })
            } else {
                Ok(format!("bytes-of-{}", url).into_bytes())
            }
        }
    }

    fn items(urls: &[&str]) -> Vec<Candidate> {
        urls.iter().enumerate().map(|(i, u)| Candidate::new(i, *u)).collect()
    }

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress { completed: 1, total: 4 }.fraction(), 0.25);
        assert_eq!(Progress { completed: 3, total: 4 }.percent(), 75);
        assert_eq!(Progress { completed: 0, total: 0 }.fraction(), 1.0);
        assert!(Progress { completed: 2, total: 2 }.is_done());
    }

    #[tokio::test]
    async fn test_sequential_reports_in_order() {
        let fetcher = MockFetcher::default();
        let list = items(&["a?wx_fmt=webp", "fail-b", "c"]);
        let mut seen = Vec::new();

        let results = fetch_sequential(&fetcher, &list, |p| seen.push(p.completed)).await;

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].url, "a?wx_fmt=jpg");
        assert_eq!(results[0].payload.as_deref(), Some(&b"bytes-of-a?wx_fmt=jpg"[..]));
        assert!(!results[1].is_hit());
        assert!(results[2].is_hit());
    }

    #[tokio::test]
    async fn test_concurrent_alignment_under_shuffle() {
        let urls = ["s0", "fail1", "s2", "s3", "fail4", "s5", "s6", "fail7", "s8", "s9"];
        let mut fetcher = MockFetcher::default();
        // later items finish first
        for (i, url) in urls.iter().enumerate() {
            fetcher.delays.insert(url.to_string(), (urls.len() - i) as u64 * 5);
        }
        let list = items(&urls);
        let mut progress = Vec::new();

        let results = fetch_concurrent(Arc::new(fetcher), &list, 4, |p| progress.push(p)).await;

        assert_eq!(results.len(), urls.len());
        for (k, result) in results.iter().enumerate() {
            assert_eq!(result.ordinal, k);
            assert_eq!(result.url, urls[k]);
            if urls[k].contains("fail") {
                assert!(result.payload.is_none(), "slot {} should be a miss", k);
            } else {
                let expected = format!("bytes-of-{}", urls[k]).into_bytes();
                assert_eq!(result.payload.as_ref(), Some(&expected));
            }
        }
        assert_eq!(count_hits(&results), 7);

        let counts: Vec<usize> = progress.iter().map(|p| p.completed).collect();
        assert_eq!(counts, (1..=urls.len()).collect::<Vec<_>>());
        assert!(progress.iter().all(|p| p.total == urls.len()));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let urls: Vec<String> = (0..20).map(|i| format!("img{}", i)).collect();
        let mut fetcher = MockFetcher::default();
        for url in &urls {
            fetcher.delays.insert(url.clone(), 10);
        }
        let fetcher = Arc::new(fetcher);
        let list: Vec<Candidate> = urls.iter().enumerate().map(|(i, u)| Candidate::new(i, u.as_str())).collect();

        let results = fetch_concurrent(Arc::clone(&fetcher), &list, 3, |_| {}).await;

        assert_eq!(count_hits(&results), 20);
        assert!(fetcher.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs() {
        let list = items(&["a", "b"]);
        let results = fetch_concurrent(Arc::new(MockFetcher::default()), &list, 0, |_| {}).await;
        assert_eq!(count_hits(&results), 2);
    }

    #[tokio::test]
    async fn test_keeps_non_contiguous_ordinals() {
        let list = vec![Candidate::new(3, "x"), Candidate::new(7, "fail-y"), Candidate::new(9, "z")];
        let results = fetch_concurrent(Arc::new(MockFetcher::default()), &list, 8, |_| {}).await;
        assert_eq!(results.iter().map(|r| r.ordinal).collect::<Vec<_>>(), vec![3, 7, 9]);
        assert!(!results[1].is_hit());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let mut calls = 0;
        let results = fetch_concurrent(Arc::new(MockFetcher::default()), &[], 8, |_| calls += 1).await;
        assert!(results.is_empty());
        assert_eq!(calls, 0);
    }
}
