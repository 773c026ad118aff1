//! Route resource cache.
//!
//! ## Contents
//! - [`ResourceCache`] keyed entries with completion fan-out over a topic bus
//! - [`CacheEntry`], [`Dispatch`], [`PageOutcome`] entry states
//! - [`LoadingRoutes`] routes whose fetch is already dispatched
//!
//! Both the cache and the loading set are owned by one
//! [`PageLoader`](crate::PageLoader); they are not process-global.

mod entry;
mod in_flight;
mod store;

pub use entry::{CacheEntry, Dispatch, PageOutcome};
pub use in_flight::LoadingRoutes;
pub use store::{BeginLoad, Completion, Join, ResourceCache};
