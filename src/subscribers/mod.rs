//! # Event subscribers for the page loader.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out and
//! built-in implementations for handling lifecycle events broadcast through the
//! [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   PageLoader ── publish(Event) ──► Bus ──► lifecycle listener ──► SubscriberSet
//!                                                                        │
//!                                                         ┌──────────────┼──────────┐
//!                                                         ▼              ▼          ▼
//!                                                     LogWriter       Metrics    Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use pageloader::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Prefetches;
//!
//! #[async_trait]
//! impl Subscribe for Prefetches {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::PrefetchIssued {
//!             // count issued preloads
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
