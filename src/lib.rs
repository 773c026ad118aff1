//! # pageloader
//!
//! **pageloader** is the client-side page module loader of a server-rendered web
//! application: given a route name it fetches, deduplicates, caches and exposes the
//! page module that renders the route.
//!
//! It normalizes route names into canonical keys, fetches each route at most once,
//! cooperates with pages the initial document already delivers, resolves dependency
//! bundles before the page, prefetches with respect for constrained networks, and
//! offers a suspense-style read cache to the renderer.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   load_page / load_page_script           prefetch               register
//!   (router, renderer)                     (link hover)           (evaluated page script)
//!            │                                  │                          │
//!            ▼                                  ▼                          ▼
//! ┌───────────────────────────────────────────────────────────────────────────────────┐
//! │  PageLoader                                                                        │
//! │  - RouteKey normalizer                                                             │
//! │  - ResourceCache (entries + TopicBus of per-route waiters)                         │
//! │  - LoadingRoutes (dispatched fetches)                                              │
//! │  - Bus (lifecycle events) ─► listener ─► SubscriberSet ─► user subscribers         │
//! └──────┬──────────────────────────────┬──────────────────────────────┬──────────────┘
//!        ▼                              ▼                              ▼
//!  ManifestProvider                   Host                       ReadCache<PageModule>
//!  (route → dependencies)   (inject / preload / markers)        (RenderRoot, suspends)
//! ```
//!
//! ### Lifecycle of a route
//! ```text
//! Unrequested ──load_page_script──► Pending(no fetch)            out-of-band marker present
//!                                   Pending(fetch)               page script injected
//!                                   Pending(fetch + deps)        dependencies, then page
//!                                        │
//!              register(route, thunk) ───┤─── fetch failure
//!                                        ▼
//!                           Finished(Ok(LoadedPage) | Err(LoadError))   permanent
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Loading**       | Deduplicated page loads, registration, prefetching.              | [`PageLoader`], [`PageLoaderBuilder`]       |
//! | **Routes**        | Canonical route keys and script URLs.                            | [`RouteKey`], [`normalize_route`]           |
//! | **Environment**   | Fetch primitive, markers, manifest and capabilities.             | [`Host`], [`ManifestProvider`], [`Capabilities`] |
//! | **Rendering**     | Suspense-style read cache and render root.                       | [`ReadCache`], [`RenderRoot`], [`suspend`]  |
//! | **Subscriber API**| Hook into loader lifecycle events.                               | [`Subscribe`], [`Event`]                    |
//! | **Errors**        | Typed errors for routes, loads and payloads.                     | [`LoadError`], [`InvalidRouteError`]        |
//! | **Configuration** | Build id, asset prefix, chunking and build mode.                 | [`LoaderConfig`]                            |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] that logs every event through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use futures::future::{self, BoxFuture, FutureExt};
//! use pageloader::{
//!     FetchError, Host, LoaderConfig, PageLoader, PageModule, PreloadRequest, ReadyState,
//!     RouteKey, ScriptRequest,
//! };
//!
//! /// A host whose scripts are always already available.
//! struct Inline;
//!
//! #[async_trait::async_trait]
//! impl Host for Inline {
//!     fn inject(&self, _request: ScriptRequest) -> BoxFuture<'static, Result<(), FetchError>> {
//!         future::ready(Ok(())).boxed()
//!     }
//!     fn preload(&self, _request: &PreloadRequest) {}
//!     fn has_page_marker(&self, _route: &RouteKey) -> bool { false }
//!     fn has_script(&self, _prefix: &str) -> bool { false }
//!     fn has_preload(&self, _prefix: &str) -> bool { false }
//!     fn ready_state(&self) -> ReadyState { ReadyState::Complete }
//!     async fn document_loaded(&self) {}
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loader = PageLoader::builder(LoaderConfig::new("build-1"), Arc::new(Inline)).build();
//!
//!     // Normally called by the evaluated page script.
//!     loader.register("/about", || Ok(PageModule::new("about page")))?;
//!
//!     let page = loader.load_page("/about/").await?;
//!     assert_eq!(page.downcast_ref::<&str>(), Some(&"about page"));
//!     Ok(())
//! }
//! ```
mod cache;
mod core;
mod error;
mod events;
mod host;
mod module;
mod resource;
mod root;
mod route;
mod subscribers;

// ---- Public re-exports ----

pub use cache::{CacheEntry, Dispatch, PageOutcome};
pub use crate::core::{HotStatus, LoaderConfig, Mode, PageLoader, PageLoaderBuilder};
pub use error::{
    BoxError, FetchError, InvalidRouteError, LoadError, PAGE_LOAD_ERROR, RootDataError,
};
pub use events::{Bus, Event, EventKind, Handler, HandlerId, Subscription, TopicBus};
pub use host::{
    BuildManifest, Capabilities, ConnectionInfo, DeferredManifest, Host, ManifestProvider,
    ManifestPublisher, PreloadRequest, ReadyState, ScriptKind, ScriptRequest, StaticManifest,
};
pub use module::{Export, LoadedPage, PageModule};
pub use resource::{PendingRead, Read, ReadCache, suspend};
pub use root::{APP_PAGE, LazyPage, RenderRoot, RootData};
pub use route::{RouteKey, ScriptUrls, normalize_route};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logging subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
