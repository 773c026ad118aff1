//! # Cache entry states.
//!
//! ```text
//!                 begin_load                        complete
//!   (absent) ───────────────► Pending(dispatch) ───────────────► Finished(outcome)
//!                                   │                                  ▲
//!                                   │ mark_dispatched                  │
//!                                   ▼                                  │
//!                   NotDispatched / Fetch / FetchWithDependencies ─────┘
//! ```
//!
//! `Finished` is terminal for the lifetime of the cache.

use crate::error::LoadError;
use crate::module::LoadedPage;

/// Terminal outcome of a route load.
pub type PageOutcome = Result<LoadedPage, LoadError>;

/// What has been sent over the network for a pending route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dispatch {
    /// No fetch issued by the loader (waiting on out-of-band delivery or on the manifest).
    #[default]
    NotDispatched,
    /// Only the page script was injected.
    Fetch,
    /// Dependency scripts were injected ahead of the page script.
    FetchWithDependencies {
        /// Number of dependency scripts injected.
        count: usize,
    },
}

/// Snapshot of a route's cache entry.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Load requested, no outcome yet.
    Pending {
        /// Number of completion handlers currently registered for the route.
        listeners: usize,
        /// Dispatch progress.
        dispatch: Dispatch,
    },
    /// Load concluded; never mutated again.
    Finished(PageOutcome),
}

impl CacheEntry {
    /// True once the entry reached its terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, CacheEntry::Finished(_))
    }

    /// The terminal outcome, if finished.
    pub fn outcome(&self) -> Option<&PageOutcome> {
        match self {
            CacheEntry::Finished(outcome) => Some(outcome),
            CacheEntry::Pending { .. } => None,
        }
    }
}

/// Stored state of a route (listener counts live in the topic bus).
#[derive(Clone)]
pub(super) enum Slot {
    Pending { dispatch: Dispatch },
    Finished(PageOutcome),
}
