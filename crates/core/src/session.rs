//! Interactive selection workflow.
//!
//! A [`Session`] owns one discovery at a time and walks it through
//! `AwaitingInput -> Discovered -> Packaged -> AwaitingInput`. While
//! `Discovered`, the caller pages through the candidates and includes or
//! excludes them one by one, a page at a time, or all at once; packaging then
//! fetches only the included images.
//!
//! The session has no rendering concerns. Presentation layers register a
//! listener with [`Session::subscribe`] and redraw on [`SessionEvent`]s.
//!
//! # Example
//!
//! ```rust
//! use pluck_core::{Phase, Pluck, Session};
//!
//! let mut session = Session::new(Pluck::new().unwrap());
//! let html = r#"<div id="js_content"><img data-src="https://cdn/a.jpg"></div>"#;
//! session.load_document("https://mp.weixin.qq.com/s/x", html).unwrap();
//!
//! assert_eq!(session.phase(), Phase::Discovered);
//! session.toggle(0).unwrap();
//! assert_eq!(session.selection().included_count(), 0);
//! ```

use std::fmt;
use std::ops::Range;

use tracing::{debug, info};

use crate::archive::Archive;
use crate::extract::Candidate;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::orchestrate::Progress;
use crate::pipeline::Pluck;
use crate::{PluckError, Result};

/// Lifecycle phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingInput,
    Discovered,
    Packaged,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingInput => "awaiting input",
            Phase::Discovered => "discovered",
            Phase::Packaged => "packaged",
        };
        f.write_str(name)
    }
}

/// Inclusion flag per candidate ordinal; everything starts included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    flags: Vec<bool>,
}

impl SelectionSet {
    pub fn new(len: usize) -> Self {
        Self { flags: vec![true; len] }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// False for unknown ordinals.
    pub fn is_included(&self, ordinal: usize) -> bool {
        self.flags.get(ordinal).copied().unwrap_or(false)
    }

    pub fn set(&mut self, ordinal: usize, included: bool) -> Result<()> {
        let flag = self.flags.get_mut(ordinal).ok_or(PluckError::NoSuchItem(ordinal))?;
        *flag = included;
        Ok(())
    }

    /// Flips one flag and returns its new value.
    pub fn toggle(&mut self, ordinal: usize) -> Result<bool> {
        let flag = self.flags.get_mut(ordinal).ok_or(PluckError::NoSuchItem(ordinal))?;
        *flag = !*flag;
        Ok(*flag)
    }

    /// Sets every ordinal in `range`, clipped to the set's length.
    pub fn set_range(&mut self, range: Range<usize>, included: bool) {
        let end = range.end.min(self.flags.len());
        let start = range.start.min(end);
        self.flags[start..end].fill(included);
    }

    pub fn set_all(&mut self, included: bool) {
        self.flags.fill(included);
    }

    pub fn included_count(&self) -> usize {
        self.flags.iter().filter(|f| **f).count()
    }

    /// Included ordinals in ascending order.
    pub fn included_ordinals(&self) -> Vec<usize> {
        self.flags.iter().enumerate().filter(|(_, f)| **f).map(|(i, _)| i).collect()
    }
}

/// 1-based page index over a fixed number of items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    page: usize,
    page_size: usize,
    total_items: usize,
}

impl PageCursor {
    pub fn new(total_items: usize, page_size: usize) -> Self {
        Self { page: 1, page_size: page_size.max(1), total_items }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// `ceil(total / page_size)`, never less than 1.
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    /// Moves to `page` if it is within `[1, total_pages]`; otherwise no-op.
    pub fn go_to(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() || page == self.page {
            return false;
        }
        self.page = page;
        true
    }

    pub fn next(&mut self) -> bool {
        self.go_to(self.page + 1)
    }

    pub fn prev(&mut self) -> bool {
        self.page > 1 && self.go_to(self.page - 1)
    }

    /// 0-based ordinal range shown on the current page.
    pub fn range(&self) -> Range<usize> {
        let start = (self.page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.total_items);
        start.min(end)..end
    }
}

/// Notification emitted after every state change.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Discovered { count: usize },
    SelectionChanged { included: usize, total: usize },
    PageChanged { page: usize, total_pages: usize },
    Progress(Progress),
    Packaged { entries: usize, attempted: usize },
    Reset,
}

/// Callback registered with [`Session::subscribe`].
pub type Listener = Box<dyn FnMut(&SessionEvent) + Send>;

/// Single-owner state for one discover, select, package cycle.
pub struct Session<F = HttpFetcher> {
    pluck: Pluck<F>,
    phase: Phase,
    source_url: Option<String>,
    candidates: Vec<Candidate>,
    selection: SelectionSet,
    cursor: PageCursor,
    archive: Option<Archive>,
    listeners: Vec<Listener>,
}

impl<F: Fetcher + 'static> Session<F> {
    pub fn new(pluck: Pluck<F>) -> Self {
        let page_size = pluck.config().page_size;
        Self {
            pluck,
            phase: Phase::AwaitingInput,
            source_url: None,
            candidates: Vec::new(),
            selection: SelectionSet::default(),
            cursor: PageCursor::new(0, page_size),
            archive: None,
            listeners: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// The packaged archive, present only in [`Phase::Packaged`].
    pub fn archive(&self) -> Option<&Archive> {
        self.archive.as_ref()
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Validates `url`, fetches it and enters [`Phase::Discovered`].
    ///
    /// Allowed while awaiting input or already discovered (which starts a
    /// fresh discovery). On any error the session is left untouched.
    pub async fn discover(&mut self, url: &str) -> Result<usize> {
        self.ensure_can_discover()?;
        let candidates = self.pluck.discover(url).await?;
        Ok(self.enter_discovered(url, candidates))
    }

    /// Same transition as [`Session::discover`] for an already retrieved document.
    pub fn load_document(&mut self, url: &str, html: &str) -> Result<usize> {
        self.ensure_can_discover()?;
        self.pluck.validate(url)?;
        let candidates = self.pluck.extract(html)?;
        Ok(self.enter_discovered(url, candidates))
    }

    /// Flips one candidate and returns its new inclusion flag.
    pub fn toggle(&mut self, ordinal: usize) -> Result<bool> {
        self.ensure_phase(Phase::Discovered, "change the selection")?;
        let included = self.selection.toggle(ordinal)?;
        debug!(ordinal, included, "toggled image");
        self.selection_changed();
        Ok(included)
    }

    pub fn set_included(&mut self, ordinal: usize, included: bool) -> Result<()> {
        self.ensure_phase(Phase::Discovered, "change the selection")?;
        self.selection.set(ordinal, included)?;
        self.selection_changed();
        Ok(())
    }

    /// Includes every candidate on the current page.
    pub fn select_page(&mut self) -> Result<()> {
        self.set_page(true)
    }

    /// Excludes every candidate on the current page.
    pub fn clear_page(&mut self) -> Result<()> {
        self.set_page(false)
    }

    pub fn select_all(&mut self) -> Result<()> {
        self.set_all(true)
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.set_all(false)
    }

    /// Returns false when already on the last page.
    pub fn next_page(&mut self) -> Result<bool> {
        self.ensure_phase(Phase::Discovered, "change page")?;
        let moved = self.cursor.next();
        self.page_changed(moved);
        Ok(moved)
    }

    /// Returns false when already on the first page.
    pub fn prev_page(&mut self) -> Result<bool> {
        self.ensure_phase(Phase::Discovered, "change page")?;
        let moved = self.cursor.prev();
        self.page_changed(moved);
        Ok(moved)
    }

    /// Jumps to a 1-based page; out-of-range pages are a no-op.
    pub fn go_to_page(&mut self, page: usize) -> Result<bool> {
        self.ensure_phase(Phase::Discovered, "change page")?;
        let moved = self.cursor.go_to(page);
        self.page_changed(moved);
        Ok(moved)
    }

    /// Candidates on the current page with their inclusion flags.
    pub fn page_items(&self) -> Vec<(&Candidate, bool)> {
        self.candidates[self.cursor.range()]
            .iter()
            .map(|c| (c, self.selection.is_included(c.ordinal)))
            .collect()
    }

    /// Included candidates in discovery order.
    pub fn included(&self) -> Vec<Candidate> {
        self.candidates
            .iter()
            .filter(|c| self.selection.is_included(c.ordinal))
            .cloned()
            .collect()
    }

    /// Fetches the included candidates and enters [`Phase::Packaged`].
    ///
    /// # Errors
    ///
    /// [`PluckError::NothingSelected`] when every candidate is excluded; the
    /// phase does not change and nothing is fetched.
    pub async fn package(&mut self) -> Result<&Archive> {
        self.ensure_phase(Phase::Discovered, "package")?;
        let items = self.included();
        if items.is_empty() {
            return Err(PluckError::NothingSelected);
        }

        info!(selected = items.len(), total = self.candidates.len(), "packaging selection");
        let listeners = &mut self.listeners;
        let archive = self
            .pluck
            .package(&items, |progress| notify(listeners, &SessionEvent::Progress(progress)))
            .await?;

        self.phase = Phase::Packaged;
        self.emit(SessionEvent::Packaged { entries: archive.entry_count(), attempted: archive.attempted() });
        Ok(self.archive.insert(archive))
    }

    /// Discards the candidates, selection, cursor and archive.
    ///
    /// Allowed from any phase.
    pub fn start_over(&mut self) {
        self.phase = Phase::AwaitingInput;
        self.source_url = None;
        self.candidates.clear();
        self.selection = SelectionSet::default();
        self.cursor = PageCursor::new(0, self.pluck.config().page_size);
        self.archive = None;
        self.emit(SessionEvent::Reset);
    }

    fn enter_discovered(&mut self, url: &str, candidates: Vec<Candidate>) -> usize {
        let count = candidates.len();
        self.selection = SelectionSet::new(count);
        self.cursor = PageCursor::new(count, self.pluck.config().page_size);
        self.candidates = candidates;
        self.source_url = Some(url.trim().to_string());
        self.archive = None;
        self.phase = Phase::Discovered;

        self.emit(SessionEvent::Discovered { count });
        count
    }

    fn set_page(&mut self, included: bool) -> Result<()> {
        self.ensure_phase(Phase::Discovered, "change the selection")?;
        self.selection.set_range(self.cursor.range(), included);
        self.selection_changed();
        Ok(())
    }

    fn set_all(&mut self, included: bool) -> Result<()> {
        self.ensure_phase(Phase::Discovered, "change the selection")?;
        self.selection.set_all(included);
        self.selection_changed();
        Ok(())
    }

    fn ensure_can_discover(&self) -> Result<()> {
        match self.phase {
            Phase::AwaitingInput | Phase::Discovered => Ok(()),
            Phase::Packaged => Err(PluckError::InvalidPhase { operation: "discover", phase: self.phase.to_string() }),
        }
    }

    fn ensure_phase(&self, expected: Phase, operation: &'static str) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(PluckError::InvalidPhase { operation, phase: self.phase.to_string() })
        }
    }

    fn selection_changed(&mut self) {
        let event =
            SessionEvent::SelectionChanged { included: self.selection.included_count(), total: self.selection.len() };
        self.emit(event);
    }

    fn page_changed(&mut self, moved: bool) {
        if moved {
            let event = SessionEvent::PageChanged { page: self.cursor.page(), total_pages: self.cursor.total_pages() };
            self.emit(event);
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        notify(&mut self.listeners, &event);
    }
}

fn notify(listeners: &mut [Listener], event: &SessionEvent) {
    for listener in listeners.iter_mut() {
        listener(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PluckConfig;
    use std::sync::{Arc, Mutex};

    struct EchoFetcher;

    impl Fetcher for EchoFetcher {
        async fn fetch_document(&self, url: &str) -> Result<String> {
            Err(PluckError::DocumentFetch { url: url.to_string(), reason: "offline".to_string() })
        }

        async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
            if url.contains("broken") {
                Err(PluckError::ImageFetch { url: url.to_string(), reason: "404".to_string() })
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    const URL: &str = "https://mp.weixin.qq.com/s/abc";

    fn article(n: usize) -> String {
        let imgs: String = (1..=n).map(|i| format!(r#"<img data-src="https://cdn/{}.jpg">"#, i)).collect();
        format!(r#"<html><body><div id="js_content">{}</div></body></html>"#, imgs)
    }

    fn session() -> Session<EchoFetcher> {
        Session::new(Pluck::with_fetcher(EchoFetcher, PluckConfig::default()))
    }

    fn discovered(n: usize) -> Session<EchoFetcher> {
        let mut s = session();
        s.load_document(URL, &article(n)).unwrap();
        s
    }

    #[test]
    fn test_selection_set() {
        let mut set = SelectionSet::new(4);
        assert_eq!(set.included_count(), 4);
        assert!(!set.toggle(1).unwrap());
        set.set_range(2..10, false);
        assert_eq!(set.included_ordinals(), vec![0]);
        assert!(!set.is_included(99));
        assert!(matches!(set.toggle(4), Err(PluckError::NoSuchItem(4))));
    }

    #[test]
    fn test_page_cursor_bounds() {
        let mut cursor = PageCursor::new(25, 12);
        assert_eq!(cursor.total_pages(), 3);
        assert!(!cursor.prev());
        assert_eq!(cursor.page(), 1);
        assert!(cursor.next());
        assert!(cursor.next());
        assert!(!cursor.next());
        assert_eq!(cursor.page(), 3);
        assert_eq!(cursor.range(), 24..25);
        assert!(!cursor.go_to(0));
        assert!(!cursor.go_to(4));
        assert_eq!(cursor.page(), 3);
    }

    #[test]
    fn test_page_cursor_empty() {
        let cursor = PageCursor::new(0, 12);
        assert_eq!(cursor.total_pages(), 1);
        assert_eq!(cursor.range(), 0..0);
    }

    #[test]
    fn test_discovery_initializes_selection() {
        let s = discovered(5);
        assert_eq!(s.phase(), Phase::Discovered);
        assert_eq!(s.candidates().len(), 5);
        assert_eq!(s.selection().included_count(), 5);
        assert_eq!(s.cursor().page(), 1);
        assert_eq!(s.source_url(), Some(URL));
    }

    #[test]
    fn test_discovery_rejects_foreign_host() {
        let mut s = session();
        let err = s.load_document("https://example.com/s/abc", &article(3)).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(s.phase(), Phase::AwaitingInput);

        let err = s.load_document("", &article(3)).unwrap_err();
        assert!(matches!(err, PluckError::InvalidUrl(_)));
        assert_eq!(s.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_empty_discovery_stays_awaiting() {
        let mut s = session();
        let err = s.load_document(URL, "<div id=\"js_content\"></div>").unwrap_err();
        assert!(matches!(err, PluckError::NoImages));
        assert_eq!(s.phase(), Phase::AwaitingInput);
    }

    #[tokio::test]
    async fn test_document_fetch_error_stays_awaiting() {
        let mut s = session();
        let err = s.discover(URL).await.unwrap_err();
        assert!(matches!(err, PluckError::DocumentFetch { .. }));
        assert_eq!(s.phase(), Phase::AwaitingInput);
    }

    #[test]
    fn test_clear_page_scope() {
        let mut s = discovered(25);
        assert_eq!(s.cursor().total_pages(), 3);
        assert!(s.next_page().unwrap());
        s.clear_page().unwrap();

        for ordinal in 0..12 {
            assert!(s.selection().is_included(ordinal), "item {} should stay included", ordinal + 1);
        }
        for ordinal in 12..24 {
            assert!(!s.selection().is_included(ordinal), "item {} should be excluded", ordinal + 1);
        }
        assert!(s.selection().is_included(24));

        s.select_all().unwrap();
        assert_eq!(s.selection().included_count(), 25);
    }

    #[test]
    fn test_page_items() {
        let mut s = discovered(14);
        s.go_to_page(2).unwrap();
        s.toggle(13).unwrap();
        let rows = s.page_items();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.ordinal, 12);
        assert!(rows[0].1);
        assert!(!rows[1].1);
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut s = discovered(3);
        assert!(!s.prev_page().unwrap());
        assert!(!s.next_page().unwrap());
        assert!(!s.go_to_page(5).unwrap());
        assert_eq!(s.cursor().page(), 1);
    }

    #[test]
    fn test_selection_requires_discovered() {
        let mut s = session();
        assert!(matches!(s.toggle(0), Err(PluckError::InvalidPhase { .. })));
        assert!(matches!(s.select_all(), Err(PluckError::InvalidPhase { .. })));
        assert!(matches!(s.next_page(), Err(PluckError::InvalidPhase { .. })));
    }

    #[tokio::test]
    async fn test_package_rejects_empty_selection() {
        let mut s = discovered(3);
        s.clear_all().unwrap();
        let err = s.package().await.unwrap_err();
        assert!(matches!(err, PluckError::NothingSelected));
        assert_eq!(s.phase(), Phase::Discovered);
        assert!(s.archive().is_none());
    }

    #[tokio::test]
    async fn test_package_fetches_only_included() {
        let mut s = discovered(5);
        s.toggle(1).unwrap();
        s.toggle(3).unwrap();

        let archive = s.package().await.unwrap();
        assert_eq!(archive.attempted(), 3);
        assert_eq!(archive.entry_count(), 3);
        assert_eq!(s.phase(), Phase::Packaged);

        assert!(matches!(s.toggle(0), Err(PluckError::InvalidPhase { .. })));
        assert!(matches!(s.load_document(URL, &article(2)), Err(PluckError::InvalidPhase { .. })));
    }

    #[tokio::test]
    async fn test_start_over_clears_everything() {
        let mut s = discovered(3);
        s.package().await.unwrap();
        s.start_over();

        assert_eq!(s.phase(), Phase::AwaitingInput);
        assert!(s.candidates().is_empty());
        assert!(s.selection().is_empty());
        assert!(s.archive().is_none());
        assert!(s.source_url().is_none());
        assert_eq!(s.cursor().page(), 1);
    }

    #[test]
    fn test_rediscovery_resets_selection() {
        let mut s = discovered(3);
        s.clear_all().unwrap();
        s.load_document(URL, &article(2)).unwrap();
        assert_eq!(s.selection().included_count(), 2);
        assert_eq!(s.candidates().len(), 2);
    }

    #[tokio::test]
    async fn test_listener_receives_events() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let mut s = session();
        s.subscribe(Box::new(move |e: &SessionEvent| sink.lock().unwrap().push(e.clone())));

        s.load_document(URL, &article(2)).unwrap();
        s.toggle(0).unwrap();
        s.select_all().unwrap();
        s.package().await.unwrap();
        s.start_over();

        let events = events.lock().unwrap();
        assert_eq!(events[0], SessionEvent::Discovered { count: 2 });
        assert_eq!(events[1], SessionEvent::SelectionChanged { included: 1, total: 2 });
        assert_eq!(events[2], SessionEvent::SelectionChanged { included: 2, total: 2 });
        let progress = events.iter().filter(|e| matches!(e, SessionEvent::Progress(_))).count();
        assert_eq!(progress, 2);
        assert!(events.contains(&SessionEvent::Packaged { entries: 2, attempted: 2 }));
        assert_eq!(events.last(), Some(&SessionEvent::Reset));
    }
}
