//! Renderer-facing read cache.
//!
//! ## Contents
//! - [`ReadCache`] name-keyed values with [`Read::Ready`] / [`Read::NotReady`] reads
//! - [`PendingRead`] handle shared by every reader of a pending entry
//! - [`suspend`] re-runs a read until it is ready
//!
//! One cache belongs to one render root; see [`RenderRoot`](crate::RenderRoot).

mod cache;
mod suspense;

pub use cache::{PendingRead, Read, ReadCache};
pub use suspense::suspend;
