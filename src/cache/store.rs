//! # Per-route resource cache.
//!
//! [`ResourceCache`] owns the entry map and the completion [`TopicBus`]. Each route key
//! is also the topic its waiters listen on.
//!
//! ## Architecture
//! ```text
//! load_page_script ──► join(key, waiter) ──┬─► Finished ─► outcome returned directly
//!                                          └─► Pending  ─► waiter registered on topic `key`
//!
//! register / fetch failure ──► complete(key, outcome)
//!                                 ├─► entry := Finished(outcome)   (under the entry lock)
//!                                 └─► topics.emit(key, outcome)    (after the lock is released)
//! ```
//!
//! ## Rules
//! - `join` checks the entry and registers the waiter under one lock, and `complete`
//!   stores the outcome before emitting; a waiter therefore sees either the stored
//!   outcome or the emission, never neither.
//! - `complete` on a finished entry is refused and returns [`Completion::AlreadyFinished`].
//! - Entries are never evicted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::entry::{CacheEntry, Dispatch, PageOutcome, Slot};
use crate::events::{Subscription, TopicBus};
use crate::route::RouteKey;

/// Result of [`ResourceCache::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeginLoad {
    /// A load was already registered for the key; no second fetch must be dispatched.
    pub already_in_flight: bool,
}

/// Result of [`ResourceCache::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The entry transitioned to `Finished`; `notified` handlers were invoked.
    Completed {
        /// Number of handlers that received the outcome.
        notified: usize,
    },
    /// The entry was already finished; the outcome was dropped.
    AlreadyFinished,
}

/// Result of [`ResourceCache::join`].
pub enum Join {
    /// The route already finished.
    Finished(PageOutcome),
    /// The route is pending; the handler will be invoked on completion.
    Waiting {
        /// Handle to the registered handler.
        subscription: Subscription<PageOutcome>,
        /// A load had been registered before this join.
        already_pending: bool,
    },
}

/// Keyed store of route entries with completion fan-out.
#[derive(Default)]
pub struct ResourceCache {
    entries: Mutex<HashMap<RouteKey, Slot>>,
    topics: TopicBus<PageOutcome>,
}

impl ResourceCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the entry for `key`.
    pub fn get(&self, key: &RouteKey) -> Option<CacheEntry> {
        let slot = self.entries.lock().get(key).cloned()?;
        Some(match slot {
            Slot::Pending { dispatch } => CacheEntry::Pending {
                listeners: self.topics.listener_count(key.as_str()),
                dispatch,
            },
            Slot::Finished(outcome) => CacheEntry::Finished(outcome),
        })
    }

    /// Transitions an absent entry to `Pending`.
    pub fn begin_load(&self, key: &RouteKey) -> BeginLoad {
        let mut entries = self.entries.lock();
        let already_in_flight = entries.contains_key(key);
        if !already_in_flight {
            entries.insert(
                key.clone(),
                Slot::Pending {
                    dispatch: Dispatch::NotDispatched,
                },
            );
        }
        BeginLoad { already_in_flight }
    }

    /// Records dispatch progress on a pending entry. No-op once finished.
    pub fn mark_dispatched(&self, key: &RouteKey, dispatch: Dispatch) {
        if let Some(Slot::Pending { dispatch: current }) = self.entries.lock().get_mut(key) {
            *current = dispatch;
        }
    }

    /// Registers a one-shot handler for the completion of `key`.
    ///
    /// The handler is only invoked by a future [`complete`](Self::complete); callers
    /// that may race with completion should use [`join`](Self::join).
    pub fn subscribe<F>(&self, key: &RouteKey, handler: F) -> Subscription<PageOutcome>
    where
        F: Fn(&PageOutcome) + Send + Sync + 'static,
    {
        let id = self.topics.once(key.as_str(), handler);
        Subscription::new(self.topics.clone(), Arc::from(key.clone()), id)
    }

    /// Returns the finished outcome, or marks the entry pending and registers `handler`.
    pub fn join<F>(&self, key: &RouteKey, handler: F) -> Join
    where
        F: Fn(&PageOutcome) + Send + Sync + 'static,
    {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(Slot::Finished(outcome)) => Join::Finished(outcome.clone()),
            existing => {
                let already_pending = existing.is_some();
                if !already_pending {
                    entries.insert(
                        key.clone(),
                        Slot::Pending {
                            dispatch: Dispatch::NotDispatched,
                        },
                    );
                }
                let subscription = self.subscribe(key, handler);
                Join::Waiting {
                    subscription,
                    already_pending,
                }
            }
        }
    }

    /// Stores the terminal outcome of `key` and notifies every registered handler.
    ///
    /// Completing a key that was never requested is allowed (out-of-band delivery
    /// may register a page before anyone asks for it).
    pub fn complete(&self, key: &RouteKey, outcome: PageOutcome) -> Completion {
        {
            let mut entries = self.entries.lock();
            if matches!(entries.get(key), Some(Slot::Finished(_))) {
                return Completion::AlreadyFinished;
            }
            entries.insert(key.clone(), Slot::Finished(outcome.clone()));
        }

        let notified = self.topics.emit(key.as_str(), &outcome);
        self.topics.clear(key.as_str());
        Completion::Completed { notified }
    }

    /// Number of entries (pending and finished).
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if no route was ever requested or registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::module::{LoadedPage, PageModule};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(raw: &str) -> RouteKey {
        RouteKey::parse(raw).unwrap()
    }

    fn ok(value: &'static str) -> PageOutcome {
        Ok(LoadedPage::from_module(PageModule::new(value)))
    }

    #[test]
    fn test_begin_load_reports_existing_load() {
        let cache = ResourceCache::new();
        let k = key("/a");
        assert!(!cache.begin_load(&k).already_in_flight);
        assert!(cache.begin_load(&k).already_in_flight);
        assert!(matches!(
            cache.get(&k),
            Some(CacheEntry::Pending {
                dispatch: Dispatch::NotDispatched,
                ..
            })
        ));
    }

    #[test]
    fn test_complete_notifies_all_subscribers_once() {
        let cache = ResourceCache::new();
        let k = key("/a");
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            cache.subscribe(&k, move |outcome| {
                assert!(outcome.is_ok());
                hits.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(
            cache.complete(&k, ok("a")),
            Completion::Completed { notified: 3 }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert!(cache.get(&k).unwrap().is_finished());
    }

    #[test]
    fn test_second_completion_is_refused() {
        let cache = ResourceCache::new();
        let k = key("/a");
        cache.begin_load(&k);
        cache.complete(
            &k,
            Err(LoadError::Init {
                route: "/a".into(),
                error: "boom".into(),
            }),
        );

        assert_eq!(cache.complete(&k, ok("late")), Completion::AlreadyFinished);
        let entry = cache.get(&k).unwrap();
        assert!(matches!(entry.outcome(), Some(Err(LoadError::Init { .. }))));
    }

    #[test]
    fn test_join_short_circuits_on_finished() {
        let cache = ResourceCache::new();
        let k = key("/a");
        cache.complete(&k, ok("a"));

        match cache.join(&k, |_| panic!("must not subscribe")) {
            Join::Finished(outcome) => assert!(outcome.is_ok()),
            Join::Waiting { .. } => panic!("expected finished entry"),
        }
    }

    #[test]
    fn test_join_counts_listeners_and_marks_pending() {
        let cache = ResourceCache::new();
        let k = key("/a");
        let first = cache.join(&k, |_| {});
        let second = cache.join(&k, |_| {});

        assert!(matches!(first, Join::Waiting { already_pending: false, .. }));
        assert!(matches!(second, Join::Waiting { already_pending: true, .. }));
        assert!(matches!(
            cache.get(&k),
            Some(CacheEntry::Pending { listeners: 2, .. })
        ));
    }

    #[test]
    fn test_unsubscribed_handler_is_not_notified() {
        let cache = ResourceCache::new();
        let k = key("/a");
        let sub = cache.subscribe(&k, |_| panic!("unsubscribed"));
        assert!(sub.unsubscribe());
        assert_eq!(
            cache.complete(&k, ok("a")),
            Completion::Completed { notified: 0 }
        );
    }

    #[test]
    fn test_mark_dispatched_ignored_after_finish() {
        let cache = ResourceCache::new();
        let k = key("/a");
        cache.begin_load(&k);
        cache.mark_dispatched(&k, Dispatch::FetchWithDependencies { count: 2 });
        assert!(matches!(
            cache.get(&k),
            Some(CacheEntry::Pending {
                dispatch: Dispatch::FetchWithDependencies { count: 2 },
                ..
            })
        ));

        cache.complete(&k, ok("a"));
        cache.mark_dispatched(&k, Dispatch::Fetch);
        assert!(cache.get(&k).unwrap().is_finished());
    }
}
