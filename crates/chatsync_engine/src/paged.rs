//! Paged collection lifecycle.

use crate::error::{EngineError, EngineResult};
use parking_lot::RwLock;
use tracing::debug;

/// Lifecycle of a paged collection, as the engine tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedRepositoryState {
    /// No fetch has started yet.
    Initializing,
    /// A fetch is in progress, nothing merged so far.
    Fetching,
    /// At least one page has merged, more remain.
    PartiallyPopulated,
    /// The population finished and no page cursor remains.
    FullyPopulated,
}

impl PagedRepositoryState {
    fn name(&self) -> &'static str {
        match self {
            PagedRepositoryState::Initializing => "Initializing",
            PagedRepositoryState::Fetching => "Fetching",
            PagedRepositoryState::PartiallyPopulated => "PartiallyPopulated",
            PagedRepositoryState::FullyPopulated => "FullyPopulated",
        }
    }
}

/// The three-state lifecycle exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagedProviderState {
    /// Results are being fetched.
    Fetching,
    /// Some results are available, more are coming.
    PartiallyPopulated,
    /// All results are available.
    FullyPopulated,
}

impl From<PagedRepositoryState> for PagedProviderState {
    fn from(state: PagedRepositoryState) -> Self {
        match state {
            PagedRepositoryState::Initializing | PagedRepositoryState::Fetching => {
                PagedProviderState::Fetching
            }
            PagedRepositoryState::PartiallyPopulated => PagedProviderState::PartiallyPopulated,
            PagedRepositoryState::FullyPopulated => PagedProviderState::FullyPopulated,
        }
    }
}

/// Tracks one paged collection's lifecycle.
///
/// Driven by backfill progress and progress-counter completion, never by
/// arbitrary external signals. A refetch re-enters `Fetching` from
/// `FullyPopulated` without touching already-merged entities; merge
/// semantics are the store's alone.
#[derive(Debug)]
pub struct PagedLifecycle {
    state: RwLock<PagedRepositoryState>,
}

impl PagedLifecycle {
    /// Creates a lifecycle in `Initializing`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(PagedRepositoryState::Initializing),
        }
    }

    /// Enters `Fetching`.
    ///
    /// Valid from `Initializing`, from `PartiallyPopulated` (a resumed
    /// population), and from `FullyPopulated` (a refetch). A fetch that
    /// is already running cannot be begun again.
    pub fn begin_fetch(&self) -> EngineResult<()> {
        let mut state = self.state.write();
        match *state {
            PagedRepositoryState::Fetching => Err(EngineError::invalid_transition(
                state.name(),
                PagedRepositoryState::Fetching.name(),
            )),
            _ => {
                debug!(from = state.name(), "paged collection fetching");
                *state = PagedRepositoryState::Fetching;
                Ok(())
            }
        }
    }

    /// Records progress: a page merged, or a sub-population concluded.
    ///
    /// `cursor_remaining` is whether any page cursor is still present;
    /// `population_finished` is whether the progress counter has
    /// reported finished. The collection is fully populated exactly when
    /// neither remains outstanding.
    pub fn advance(&self, cursor_remaining: bool, population_finished: bool) -> EngineResult<()> {
        let mut state = self.state.write();
        match *state {
            // A late completion report from a racing worker after the
            // collection already finished is a no-op, not an error.
            PagedRepositoryState::FullyPopulated if !cursor_remaining && population_finished => {
                Ok(())
            }
            PagedRepositoryState::Initializing | PagedRepositoryState::FullyPopulated => {
                Err(EngineError::invalid_transition(
                    state.name(),
                    if cursor_remaining || !population_finished {
                        PagedRepositoryState::PartiallyPopulated.name()
                    } else {
                        PagedRepositoryState::FullyPopulated.name()
                    },
                ))
            }
            PagedRepositoryState::Fetching | PagedRepositoryState::PartiallyPopulated => {
                let next = if !cursor_remaining && population_finished {
                    PagedRepositoryState::FullyPopulated
                } else {
                    PagedRepositoryState::PartiallyPopulated
                };
                if *state != next {
                    debug!(from = state.name(), to = next.name(), "paged collection advanced");
                    *state = next;
                }
                Ok(())
            }
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PagedRepositoryState {
        *self.state.read()
    }

    /// Consumer-facing lifecycle state.
    #[must_use]
    pub fn provider_state(&self) -> PagedProviderState {
        PagedProviderState::from(self.state())
    }
}

impl Default for PagedLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
