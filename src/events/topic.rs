//! # Topic-keyed publish/subscribe.
//!
//! [`TopicBus`] delivers a typed payload to every handler registered on a topic string.
//! The page loader uses one topic per route key to fan a single completion out to all
//! pending requests for that route.
//!
//! ## Rules
//! - `emit` snapshots the handlers of a topic, releases the lock, then invokes them;
//!   handlers may call back into the bus (`on`/`off`/`emit`) without deadlocking.
//! - Handlers registered with [`TopicBus::once`] are removed by the `emit` that fires
//!   them, so each fires at most once.
//! - A topic with no handlers left is removed from the map.
//! - Handlers run on the emitting task, in registration order.
//!
//! ```text
//! once("/blog", h1) ─┐
//! once("/blog", h2) ─┼─► topics["/blog"] = [h1, h2]
//! on("/blog",   h3) ─┘
//!
//! emit("/blog", outcome) ─► h1(outcome), h2(outcome), h3(outcome)
//!                           topics["/blog"] = [h3]
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared handler invoked with a borrowed payload.
pub type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifier of a registered handler, unique per bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Registration<T> {
    id: HandlerId,
    once: bool,
    handler: Handler<T>,
}

struct Topics<T> {
    next_id: u64,
    topics: HashMap<Arc<str>, Vec<Registration<T>>>,
}

/// Typed publish/subscribe keyed by topic string.
///
/// Cheap to clone; clones share the same registrations.
pub struct TopicBus<T> {
    inner: Arc<Mutex<Topics<T>>>,
}

impl<T> Clone for TopicBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TopicBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TopicBus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Topics {
                next_id: 0,
                topics: HashMap::new(),
            })),
        }
    }

    /// Registers a handler that fires on every `emit` for `topic` until removed.
    pub fn on<F>(&self, topic: &str, handler: F) -> HandlerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(topic, false, Arc::new(handler))
    }

    /// Registers a handler that fires on the next `emit` for `topic` and is then removed.
    pub fn once<F>(&self, topic: &str, handler: F) -> HandlerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.register(topic, true, Arc::new(handler))
    }

    /// Removes a handler. Returns `false` if it was not registered (or already fired once).
    pub fn off(&self, topic: &str, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let Some(regs) = inner.topics.get_mut(topic) else {
            return false;
        };
        let before = regs.len();
        regs.retain(|r| r.id != id);
        let removed = regs.len() != before;
        if regs.is_empty() {
            inner.topics.remove(topic);
        }
        removed
    }

    /// Invokes every handler registered on `topic` with `payload`.
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, topic: &str, payload: &T) -> usize {
        let handlers: Vec<Handler<T>> = {
            let mut inner = self.inner.lock();
            let Some(regs) = inner.topics.get_mut(topic) else {
                return 0;
            };
            let handlers = regs.iter().map(|r| Arc::clone(&r.handler)).collect();
            regs.retain(|r| !r.once);
            if regs.is_empty() {
                inner.topics.remove(topic);
            }
            handlers
        };

        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    /// Number of handlers currently registered on `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.lock().topics.get(topic).map_or(0, Vec::len)
    }

    /// Removes every handler registered on `topic`.
    pub fn clear(&self, topic: &str) {
        self.inner.lock().topics.remove(topic);
    }

    fn register(&self, topic: &str, once: bool, handler: Handler<T>) -> HandlerId {
        let mut inner = self.inner.lock();
        let id = HandlerId(inner.next_id);
        inner.next_id += 1;
        inner
            .topics
            .entry(Arc::from(topic))
            .or_default()
            .push(Registration { id, once, handler });
        id
    }
}

/// Handle to a registration; [`Subscription::unsubscribe`] removes it.
///
/// Dropping the handle does **not** unsubscribe.
pub struct Subscription<T> {
    bus: TopicBus<T>,
    topic: Arc<str>,
    id: HandlerId,
}

impl<T> Subscription<T> {
    pub(crate) fn new(bus: TopicBus<T>, topic: Arc<str>, id: HandlerId) -> Self {
        Self { bus, topic, id }
    }

    /// Topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Removes the handler. Returns `false` if it already fired (one-shot) or was removed.
    pub fn unsubscribe(self) -> bool {
        self.bus.off(&self.topic, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&u32) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, move |_: &u32| {
            h.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_emit_reaches_only_matching_topic() {
        let bus = TopicBus::<u32>::new();
        let (a, ha) = counter();
        let (b, hb) = counter();
        bus.on("/a", ha);
        bus.on("/b", hb);

        assert_eq!(bus.emit("/a", &1), 1);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_once_fires_at_most_once() {
        let bus = TopicBus::<u32>::new();
        let (hits, h) = counter();
        let id = bus.once("/a", h);

        bus.emit("/a", &1);
        bus.emit("/a", &2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("/a"), 0);
        assert!(!bus.off("/a", id));
    }

    #[test]
    fn test_off_removes_handler() {
        let bus = TopicBus::<u32>::new();
        let (hits, h) = counter();
        let id = bus.on("/a", h);
        assert!(bus.off("/a", id));
        assert_eq!(bus.emit("/a", &1), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_may_reenter_bus() {
        let bus = TopicBus::<u32>::new();
        let (hits, h) = counter();
        bus.on("/b", h);

        let inner = bus.clone();
        bus.once("/a", move |v: &u32| {
            inner.emit("/b", v);
        });

        bus.emit("/a", &7);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_unsubscribe() {
        let bus = TopicBus::<u32>::new();
        let (hits, h) = counter();
        let id = bus.on("/a", h);
        let sub = Subscription::new(bus.clone(), Arc::from("/a"), id);
        assert_eq!(sub.topic(), "/a");
        assert!(sub.unsubscribe());
        bus.emit("/a", &1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
