//! Loader core: configuration, request path, dispatch and prefetching.
//!
//! The public API from this module is [`PageLoader`] (built through
//! [`PageLoaderBuilder`]) and its configuration types.
//!
//! Internal modules:
//! - [`loader`]: request path, registration and completion;
//! - [`dispatch`]: dependency resolution and script injection for a claimed route;
//! - [`prefetch`]: network-aware speculative loading;
//! - [`builder`]: assembles the loader and its lifecycle listener;
//! - [`hot`]: hot-reload coordinator status.

mod builder;
mod config;
mod dispatch;
mod hot;
mod loader;
mod prefetch;

pub use builder::PageLoaderBuilder;
pub use config::{LoaderConfig, Mode};
pub use hot::HotStatus;
pub use loader::PageLoader;
