//! # Read cache with shared pending handles.
//!
//! ```text
//! read("x")  (absent)    ─► entry := Pending(h) ─► NotReady(h)
//! read("x")  (pending)   ─────────────────────────► NotReady(h)   same handle
//! write("x", f)          ─► entry := Finished(f()) ─► h settled
//! read("x")  (finished)  ─────────────────────────► Ready(value)
//! ```
//!
//! An entry never goes back to pending. Writing a finished entry replaces its value.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Outcome of a [`ReadCache::read`].
#[derive(Debug)]
pub enum Read<V> {
    /// The value is available.
    Ready(V),
    /// The value is not written yet; retry after the handle settles.
    NotReady(PendingRead),
}

impl<V> Read<V> {
    /// True for [`Read::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Read::Ready(_))
    }

    /// The value, if ready.
    pub fn ready(self) -> Option<V> {
        match self {
            Read::Ready(v) => Some(v),
            Read::NotReady(_) => None,
        }
    }

    /// Maps a ready value, keeping a pending handle as is.
    pub fn map<U, F>(self, f: F) -> Read<U>
    where
        F: FnOnce(V) -> U,
    {
        match self {
            Read::Ready(v) => Read::Ready(f(v)),
            Read::NotReady(handle) => Read::NotReady(handle),
        }
    }
}

#[derive(Debug, Default)]
struct Signal {
    settled: AtomicBool,
    notify: Notify,
}

/// Handle shared by every reader of a pending entry.
///
/// Cheap to clone. Settles exactly once, when the entry is written.
#[derive(Debug, Clone, Default)]
pub struct PendingRead(Arc<Signal>);

impl PendingRead {
    /// Resolves once the entry was written. Returns immediately if it already was.
    pub async fn settled(&self) {
        let notified = self.0.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_settled() {
            return;
        }
        notified.await;
    }

    /// True once the entry was written.
    pub fn is_settled(&self) -> bool {
        self.0.settled.load(Ordering::Acquire)
    }

    /// True if both handles belong to the same pending entry.
    pub fn ptr_eq(&self, other: &PendingRead) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn settle(&self) {
        self.0.settled.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }
}

enum Entry<V> {
    Pending(PendingRead),
    Finished(V),
}

/// Name-keyed cache read by the renderer and written by the loader.
///
/// Cheap to clone; clones share the same entries.
pub struct ReadCache<V> {
    entries: Arc<Mutex<HashMap<String, Entry<V>>>>,
}

impl<V> Clone for ReadCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl<V> Default for ReadCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V: Clone> ReadCache<V> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, or the handle to wait on while it is pending.
    pub fn read(&self, name: &str) -> Read<V> {
        let mut entries = self.entries.lock();
        match entries.get(name) {
            Some(Entry::Finished(value)) => Read::Ready(value.clone()),
            Some(Entry::Pending(handle)) => Read::NotReady(handle.clone()),
            None => {
                let handle = PendingRead::default();
                entries.insert(name.to_string(), Entry::Pending(handle.clone()));
                Read::NotReady(handle)
            }
        }
    }

    /// Stores the value produced by `factory` and settles a pending handle, if any.
    pub fn write<F>(&self, name: &str, factory: F)
    where
        F: FnOnce() -> V,
    {
        let value = factory();
        let previous = self
            .entries
            .lock()
            .insert(name.to_string(), Entry::Finished(value));
        if let Some(Entry::Pending(handle)) = previous {
            handle.settle();
        }
    }

    /// True if `name` holds a written value.
    pub fn is_finished(&self, name: &str) -> bool {
        matches!(self.entries.lock().get(name), Some(Entry::Finished(_)))
    }

    /// Number of entries, pending or finished.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True if nothing was read or written yet.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
