//! Page source abstraction for bulk backfills.

use crate::error::{EngineError, EngineResult};
use chatsync_model::Mutation;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;

/// Opaque continuation token handed back by the backfill endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Creates a cursor from its wire form.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the wire form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cursor:{}", self.0)
    }
}

/// One page of backfill results.
#[derive(Debug, Clone)]
pub struct Page {
    /// Decoded, versioned mutations in this page.
    pub mutations: Vec<Mutation>,
    /// Continuation token; `None` means no further pages.
    pub next: Option<PageCursor>,
}

impl Page {
    /// Creates a page with a continuation cursor.
    pub fn new(mutations: Vec<Mutation>, next: PageCursor) -> Self {
        Self {
            mutations,
            next: Some(next),
        }
    }

    /// Creates a final page.
    pub fn last(mutations: Vec<Mutation>) -> Self {
        Self {
            mutations,
            next: None,
        }
    }

    /// Returns true if more pages are available after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// A paged fetch endpoint, as the transport collaborator exposes it.
///
/// Implementations own their retries and timeouts; a returned error is a
/// conclusive failure for this fetch.
pub trait PageSource: Send + Sync {
    /// Fetches one page of results.
    ///
    /// `cursor` is `None` for the first page. `limit` is the requested
    /// page size; sources may return fewer results.
    fn fetch_page(&self, cursor: Option<&PageCursor>, limit: u32) -> EngineResult<Page>;
}

impl<S: PageSource + ?Sized> PageSource for std::sync::Arc<S> {
    fn fetch_page(&self, cursor: Option<&PageCursor>, limit: u32) -> EngineResult<Page> {
        (**self).fetch_page(cursor, limit)
    }
}

/// Outcome queued in a [`MockPageSource`].
type QueuedFetch = EngineResult<Page>;

/// A mock page source for testing.
///
/// Serves queued pages (or failures) in order, one per fetch.
#[derive(Debug, Default)]
pub struct MockPageSource {
    queue: Mutex<VecDeque<QueuedFetch>>,
}

impl MockPageSource {
    /// Creates an empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a page.
    pub fn push_page(&self, page: Page) {
        self.queue.lock().push_back(Ok(page));
    }

    /// Queues a fetch failure.
    pub fn push_error(&self, message: impl Into<String>) {
        self.queue
            .lock()
            .push_back(Err(EngineError::page_source(message)));
    }

    /// Number of queued fetch outcomes remaining.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.lock().len()
    }
}

impl PageSource for MockPageSource {
    fn fetch_page(&self, _cursor: Option<&PageCursor>, _limit: u32) -> EngineResult<Page> {
        self.queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::page_source("no mock page queued")))
    }
}
