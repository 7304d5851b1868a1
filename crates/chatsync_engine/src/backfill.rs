//! Paged backfill driver.
//!
//! Backfill results race live events for the same entities; no ordering
//! is imposed here. The store's per-signature version check is the only
//! arbiter, so pages can be applied as they arrive and stale results
//! are counted, not treated as failures.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::paged::{PagedLifecycle, PagedRepositoryState};
use crate::source::{PageCursor, PageSource};
use chatsync_store::{ApplyResult, ProgressCounter, ProgressSummary, Store};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Totals from one backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    /// Pages fetched.
    pub pages: u64,
    /// Mutations merged.
    pub applied: u64,
    /// Mutations rejected as stale (normal under races with live events).
    pub stale: u64,
    /// Mutations rejected as malformed.
    pub malformed: u64,
}

/// Drives one collection's paged population against a shared store.
pub struct Backfill<S: PageSource> {
    store: Arc<Store>,
    source: S,
    config: EngineConfig,
    lifecycle: Arc<PagedLifecycle>,
    cancelled: AtomicBool,
}

impl<S: PageSource> Backfill<S> {
    /// Creates a backfill with the default configuration.
    pub fn new(store: Arc<Store>, source: S) -> Self {
        Self::with_config(store, source, EngineConfig::default())
    }

    /// Creates a backfill with an explicit configuration.
    pub fn with_config(store: Arc<Store>, source: S, config: EngineConfig) -> Self {
        Self {
            store,
            source,
            config,
            lifecycle: Arc::new(PagedLifecycle::new()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// The lifecycle this backfill drives.
    #[must_use]
    pub fn lifecycle(&self) -> Arc<PagedLifecycle> {
        Arc::clone(&self.lifecycle)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PagedRepositoryState {
        self.lifecycle.state()
    }

    /// Cancels a run in progress on another thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Fetches and merges pages until the cursor drains.
    ///
    /// A later call re-enters `Fetching` from `FullyPopulated` without
    /// discarding already-merged entities.
    pub fn run(&self) -> EngineResult<BackfillSummary> {
        self.cancelled.store(false, Ordering::SeqCst);
        self.lifecycle.begin_fetch()?;

        // One sub-operation: this collection's population.
        let counter = ProgressCounter::new(1);
        let mut summary = BackfillSummary::default();
        let mut cursor: Option<PageCursor> = None;

        loop {
            self.check_cancelled()?;

            let page = match self.source.fetch_page(cursor.as_ref(), self.config.page_size) {
                Ok(page) => page,
                Err(error) => {
                    warn!(
                        collection = %self.config.collection,
                        %error,
                        "backfill fetch failed"
                    );
                    let _ = counter.increment_failure();
                    return Err(error);
                }
            };

            summary.pages += 1;
            for mutation in page.mutations {
                match self.store.apply(mutation) {
                    ApplyResult::Applied(_) => summary.applied += 1,
                    ApplyResult::RejectedStale => summary.stale += 1,
                    ApplyResult::RejectedMalformed(_) => summary.malformed += 1,
                }
            }

            match page.next {
                Some(next) => {
                    self.lifecycle.advance(true, false)?;
                    cursor = Some(next);
                }
                None => {
                    counter.increment_success()?;
                    self.lifecycle.advance(false, counter.is_finished())?;
                    break;
                }
            }
        }

        debug!(
            collection = %self.config.collection,
            pages = summary.pages,
            applied = summary.applied,
            stale = summary.stale,
            "backfill complete"
        );
        Ok(summary)
    }
}

/// Populates N rooms in parallel against a shared store.
///
/// One worker per room source reports its outcome to a shared
/// [`ProgressCounter`]; the call returns when the counter's finished
/// signal fires. Workers run in batches of `config.max_parallel_rooms`.
/// An empty source list finishes immediately (the zero-total counter
/// boundary, checked explicitly here).
pub fn populate_rooms<S>(
    store: Arc<Store>,
    sources: Vec<S>,
    lifecycle: Arc<PagedLifecycle>,
    config: &EngineConfig,
) -> EngineResult<ProgressSummary>
where
    S: PageSource + Send + 'static,
{
    lifecycle.begin_fetch()?;

    let counter = Arc::new(ProgressCounter::new(sources.len()));
    let finished = counter.finished_signal();

    if sources.is_empty() {
        lifecycle.advance(false, true)?;
        return finished
            .recv()
            .map_err(|_| EngineError::page_source("population completion signal lost"));
    }

    let page_size = config.page_size;
    let mut remaining = sources.into_iter();
    loop {
        let batch: Vec<S> = remaining.by_ref().take(config.max_parallel_rooms).collect();
        if batch.is_empty() {
            break;
        }

        let mut handles = Vec::new();
        for source in batch {
            let store = Arc::clone(&store);
            let counter = Arc::clone(&counter);
            let lifecycle = Arc::clone(&lifecycle);
            handles.push(thread::spawn(move || {
                populate_one_room(&store, &source, &counter, &lifecycle, page_size);
            }));
        }
        for handle in handles {
            if handle.join().is_err() {
                return Err(EngineError::page_source("room population worker panicked"));
            }
        }
    }

    finished
        .recv()
        .map_err(|_| EngineError::page_source("population completion signal lost"))
}

/// Drains one room's pages, reporting the outcome to the shared counter.
fn populate_one_room<S: PageSource>(
    store: &Store,
    source: &S,
    counter: &ProgressCounter,
    lifecycle: &PagedLifecycle,
    page_size: u32,
) {
    let mut cursor: Option<PageCursor> = None;
    loop {
        match source.fetch_page(cursor.as_ref(), page_size) {
            Ok(page) => {
                for mutation in page.mutations {
                    // Stale results are normal here; the store counts them.
                    let _ = store.apply(mutation);
                }
                match page.next {
                    Some(next) => {
                        cursor = Some(next);
                        report(lifecycle.advance(true, false));
                    }
                    None => {
                        report(counter.increment_success().map(|_| ()));
                        report(lifecycle.advance(false, counter.is_finished()));
                        return;
                    }
                }
            }
            Err(error) => {
                warn!(%error, "room population fetch failed");
                report(counter.increment_failure().map(|_| ()));
                report(lifecycle.advance(false, counter.is_finished()));
                return;
            }
        }
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    if let Err(error) = result {
        warn!(%error, "room population bookkeeping failed");
    }
}
