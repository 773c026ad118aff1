//! # Lifecycle events emitted by the page loader and prefetcher.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Request events**: a route was requested, served from cache, or found out of band
//! - **Dispatch events**: scripts injected for a route (dependencies, page) and their failures
//! - **Completion events**: registration outcome of a route
//! - **Prefetch events**: speculative loading decisions
//!
//! The [`Event`] struct carries additional metadata such as timestamps, route,
//! script URL and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use pageloader::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::FetchFailed)
//!     .with_route("/blog")
//!     .with_url("/_next/static/b/pages/blog.js")
//!     .with_reason("PAGE_LOAD_ERROR");
//!
//! assert_eq!(ev.kind, EventKind::FetchFailed);
//! assert_eq!(ev.route.as_deref(), Some("/blog"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic info
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason
    SubscriberOverflow,

    // === Request events ===
    /// A page load was requested and is now pending.
    ///
    /// Sets:
    /// - `route`: normalized route
    RouteRequested,

    /// A page load was served from a finished cache entry.
    ///
    /// Sets:
    /// - `route`: normalized route
    CacheHit,

    /// The page is already being delivered by the initial document; no fetch dispatched.
    ///
    /// Sets:
    /// - `route`: normalized route
    OutOfBandDetected,

    // === Dispatch events ===
    /// A dependency script was injected ahead of the page script.
    ///
    /// Sets:
    /// - `route`: route the dependency belongs to
    /// - `url`: dependency URL
    DependencyDispatched,

    /// The page script was injected.
    ///
    /// Sets:
    /// - `route`: normalized route
    /// - `url`: page script URL
    FetchDispatched,

    /// An injected script failed at the transport level.
    ///
    /// Sets:
    /// - `route`: normalized route
    /// - `url`: failing script URL
    /// - `reason`: transport failure message
    FetchFailed,

    // === Completion events ===
    /// Registration was postponed until the hot-reload coordinator is idle.
    ///
    /// Sets:
    /// - `route`: normalized route
    /// - `reason`: coordinator status at the time of registration
    RegistrationDeferred,

    /// The route finished successfully.
    ///
    /// Sets:
    /// - `route`: normalized route
    RouteRegistered,

    /// The route finished with a failure.
    ///
    /// Sets:
    /// - `route`: normalized route
    /// - `reason`: failure message
    RouteFailed,

    /// A completion arrived for a route that had already finished; it was ignored.
    ///
    /// Sets:
    /// - `route`: normalized route
    /// - `reason`: label of the ignored outcome
    DuplicateCompletion,

    // === Prefetch events ===
    /// A prefetch was skipped.
    ///
    /// Sets:
    /// - `route`: normalized route (or dependency path)
    /// - `reason`: `cached`, `marker_present` or `constrained_network`
    PrefetchSkipped,

    /// A preload directive was issued.
    ///
    /// Sets:
    /// - `route`: normalized route (or dependency path)
    /// - `url`: preloaded URL
    PrefetchIssued,

    /// Preload is unsupported; the prefetch falls back to a full page load.
    ///
    /// Sets:
    /// - `route`: normalized route
    PrefetchFallback,
}

impl EventKind {
    /// Returns a short stable label (kebab-case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::SubscriberPanicked => "subscriber-panicked",
            EventKind::SubscriberOverflow => "subscriber-overflow",
            EventKind::RouteRequested => "requested",
            EventKind::CacheHit => "cache-hit",
            EventKind::OutOfBandDetected => "out-of-band",
            EventKind::DependencyDispatched => "dependency",
            EventKind::FetchDispatched => "fetch",
            EventKind::FetchFailed => "fetch-failed",
            EventKind::RegistrationDeferred => "deferred",
            EventKind::RouteRegistered => "registered",
            EventKind::RouteFailed => "failed",
            EventKind::DuplicateCompletion => "duplicate-completion",
            EventKind::PrefetchSkipped => "prefetch-skipped",
            EventKind::PrefetchIssued => "prefetch",
            EventKind::PrefetchFallback => "prefetch-fallback",
        }
    }
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Normalized route, if applicable.
    pub route: Option<Arc<str>>,
    /// Script URL, if applicable.
    pub url: Option<Arc<str>>,
    /// Human-readable reason (errors, skip causes, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            route: None,
            url: None,
            reason: None,
        }
    }

    /// Attaches a route.
    #[inline]
    pub fn with_route(mut self, route: impl Into<Arc<str>>) -> Self {
        self.route = Some(route.into());
        self
    }

    /// Attaches a script URL.
    #[inline]
    pub fn with_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }

    /// True for events produced by the subscriber machinery itself.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
