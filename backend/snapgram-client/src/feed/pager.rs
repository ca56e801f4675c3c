use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use remote_store::StoreError;
use tracing::{debug, warn};

use super::{FeedItem, FeedQuery, PageSource};
use crate::error::{AppError, Result};

/// Result of asking the pager for another page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// A page arrived; carries the number of items it added
    Loaded(usize),
    /// The last fetch returned an empty page
    EndOfStream,
    /// A fetch is already running; nothing was requested
    InFlight,
    /// The query was reset while the page was loading; the page was dropped
    Stale,
}

struct PagerState<T> {
    query: FeedQuery,
    items: Vec<T>,
    seen: HashSet<String>,
    cursor: Option<String>,
    end_reached: bool,
    in_flight: bool,
    generation: u64,
    pages_loaded: usize,
    last_error: Option<String>,
}

impl<T: FeedItem> PagerState<T> {
    fn new(query: FeedQuery, generation: u64) -> Self {
        Self {
            query,
            items: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            end_reached: false,
            in_flight: false,
            generation,
            pages_loaded: 0,
            last_error: None,
        }
    }

    /// Append unseen items and restore (created_at desc, id desc) order
    fn merge(&mut self, page: Vec<T>) -> usize {
        let before = self.items.len();
        for item in page {
            if self.seen.insert(item.id().to_string()) {
                self.items.push(item);
            }
        }
        self.items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        self.items.len() - before
    }

    /// Forget the item the cursor points at and return the cursor of the item
    /// before it; `None` when there is nothing to step back from
    fn step_back(&mut self, missing: Option<&str>) -> Option<Option<String>> {
        let missing = missing?;
        if !self.seen.remove(missing) {
            return None;
        }
        self.items.retain(|item| item.id() != missing);
        Some(self.items.last().map(|item| item.id().to_string()))
    }
}

/// Clears the in-flight flag when a fetch ends before its bookkeeping ran,
/// e.g. when the future is dropped by a timeout or `select!`
struct InFlightGuard<'a, T> {
    state: &'a Mutex<PagerState<T>>,
    generation: u64,
    armed: bool,
}

impl<T> InFlightGuard<'_, T> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        // A reset already started a new query with its own flag.
        if state.generation == self.generation {
            debug!(generation = self.generation, "page fetch abandoned");
            state.in_flight = false;
        }
    }
}

/// Backend rejected the cursor because its document no longer exists
fn is_missing_cursor(err: &AppError) -> bool {
    matches!(err, AppError::Store(StoreError::InvalidRequest(msg)) if msg.contains("cursor"))
}

/// Infinite-scroll pager over a `PageSource`
///
/// The state lock is released while a page is loading. A second call during
/// that time returns `PageOutcome::InFlight` instead of issuing a duplicate
/// request. A fetch that is dropped mid-request releases the in-flight flag.
pub struct FeedPager<T> {
    source: Arc<dyn PageSource<T>>,
    page_size: usize,
    state: Mutex<PagerState<T>>,
}

impl<T: FeedItem> FeedPager<T> {
    pub fn new(source: Arc<dyn PageSource<T>>, query: FeedQuery, page_size: usize) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            state: Mutex::new(PagerState::new(query, 0)),
        }
    }

    /// Load the page after the current cursor
    ///
    /// On failure the cursor stays where it was, so the next call retries the
    /// same position. If the cursor item was deleted in the meantime, the
    /// pager drops it and resumes from the item before it.
    pub async fn fetch_next_page(&self) -> Result<PageOutcome> {
        let (query, mut cursor, generation) = {
            let mut state = self.state.lock();
            if state.in_flight {
                debug!("page fetch already in flight");
                return Ok(PageOutcome::InFlight);
            }
            if state.end_reached {
                return Ok(PageOutcome::EndOfStream);
            }
            state.in_flight = true;
            (state.query.clone(), state.cursor.clone(), state.generation)
        };
        let mut guard = InFlightGuard {
            state: &self.state,
            generation,
            armed: true,
        };

        loop {
            let result = self
                .source
                .fetch_page(&query, cursor.as_deref(), self.page_size)
                .await;

            let mut state = self.state.lock();
            if state.generation != generation {
                guard.disarm();
                debug!(generation, current = state.generation, "dropping page for a reset query");
                return Ok(PageOutcome::Stale);
            }

            let page = match result {
                Ok(page) => page,
                Err(e) => {
                    if is_missing_cursor(&e) {
                        if let Some(previous) = state.step_back(cursor.as_deref()) {
                            warn!(
                                missing = ?cursor,
                                resume_from = ?previous,
                                "cursor item is gone, resuming from the item before it"
                            );
                            state.cursor = previous.clone();
                            cursor = previous;
                            continue;
                        }
                    }
                    guard.disarm();
                    state.in_flight = false;
                    warn!(cursor = ?cursor, error = %e, "page fetch failed");
                    state.last_error = Some(e.to_string());
                    return Err(e);
                }
            };
            guard.disarm();
            state.in_flight = false;
            state.last_error = None;

            let last_id = match page.last() {
                Some(item) => item.id().to_string(),
                None => {
                    debug!(pages = state.pages_loaded, items = state.items.len(), "end of feed");
                    state.end_reached = true;
                    return Ok(PageOutcome::EndOfStream);
                }
            };

            state.cursor = Some(last_id);
            state.pages_loaded += 1;
            let added = state.merge(page);
            return Ok(PageOutcome::Loaded(added));
        }
    }

    /// Keep loading until the stream ends or `max_pages` pages were fetched
    pub async fn fetch_pages(&self, max_pages: usize) -> Result<usize> {
        let mut added = 0;
        for _ in 0..max_pages {
            match self.fetch_next_page().await? {
                PageOutcome::Loaded(n) => added += n,
                PageOutcome::EndOfStream | PageOutcome::InFlight | PageOutcome::Stale => break,
            }
        }
        Ok(added)
    }

    /// Switch to a new query and start over from the first page
    pub fn reset(&self, query: FeedQuery) {
        let mut state = self.state.lock();
        let generation = state.generation + 1;
        *state = PagerState::new(query, generation);
    }

    pub fn items(&self) -> Vec<T> {
        self.state.lock().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn query(&self) -> FeedQuery {
        self.state.lock().query.clone()
    }

    pub fn cursor(&self) -> Option<String> {
        self.state.lock().cursor.clone()
    }

    pub fn has_next_page(&self) -> bool {
        !self.state.lock().end_reached
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().in_flight
    }

    pub fn pages_loaded(&self) -> usize {
        self.state.lock().pages_loaded
    }

    /// Error of the last failed fetch, cleared by a success
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().last_error.clone()
    }
}
