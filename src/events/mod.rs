//! Events: lifecycle broadcast and per-route completion topics.
//!
//! This module groups the event **data model**, the lifecycle **bus** used to
//! publish/subscribe to loader events, and the **topic bus** that delivers route
//! completions to pending requests.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` (observability)
//! - [`TopicBus`], [`Subscription`] keyed publish/subscribe (completion fan-out)
//!
//! ## Quick reference
//! - **Lifecycle publishers**: `PageLoader`, fetch watcher tasks, the prefetcher,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Lifecycle consumers**: the loader's listener task, which fans out to `SubscriberSet`.
//! - **Topic publishers**: `ResourceCache::complete`, one emit per route.
//! - **Topic consumers**: one-shot waiters installed by `PageLoader::load_page_script`.

mod bus;
mod event;
mod topic;

pub use bus::Bus;
pub use event::{Event, EventKind};
pub use topic::{Handler, HandlerId, Subscription, TopicBus};
