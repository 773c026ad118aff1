//! # PageLoader: deduplicating page module loader.
//!
//! The loader turns a route name into its page module, fetching each route at most
//! once and delivering one outcome to every requester.
//!
//! ## Request path
//! ```text
//! load_page_script(route)
//!   ├─► RouteKey::parse(route)                      (InvalidRoute, never cached)
//!   ├─► cache.join(key, waiter)
//!   │     ├─ Finished ─► publish CacheHit ─► return outcome
//!   │     └─ Pending  ─► waiter registered on topic `key`
//!   ├─► publish RouteRequested
//!   ├─► host.has_page_marker(key)?  ─► publish OutOfBandDetected (no fetch)
//!   ├─► loading.claim(key)?         ─► dispatch (see `dispatch.rs`)
//!   └─► await waiter
//! ```
//!
//! ## Completion path
//! ```text
//! register(route, thunk)                 fetch watcher (transport failure)
//!   ├─► dev + hot status != idle             │
//!   │     └─► wait for idle (spawned)        │
//!   ├─► run thunk (panics caught)            │
//!   └─► finish(key, outcome) ◄───────────────┘
//!         ├─► cache.complete(key, outcome) ─► every waiter notified once
//!         ├─► read cache write (success only)
//!         └─► publish RouteRegistered / RouteFailed / DuplicateCompletion
//! ```
//!
//! ## Rules
//! - A `Finished` entry is permanent: failures are not retried.
//! - Dispatched fetches are never cancelled; they complete the cache even when every
//!   requester stopped waiting.
//! - No lock is held while calling into the [`Host`] or a completion handler.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, Completion, Join, LoadingRoutes, PageOutcome, ResourceCache};
use crate::core::{HotStatus, LoaderConfig, PageLoaderBuilder};
use crate::error::{BoxError, InvalidRouteError, LoadError};
use crate::events::{Bus, Event, EventKind};
use crate::host::{Capabilities, Host, ManifestProvider};
use crate::module::{Export, LoadedPage, PageModule};
use crate::resource::ReadCache;
use crate::route::{RouteKey, ScriptUrls};
use crate::subscribers::SubscriberSet;

/// Page module loader bound to one host and one build.
///
/// Created through [`PageLoader::builder`]; always used behind an `Arc`.
pub struct PageLoader {
    pub(super) cfg: LoaderConfig,
    pub(super) urls: ScriptUrls,
    pub(super) host: Arc<dyn Host>,
    pub(super) caps: Capabilities,
    pub(super) manifest: Option<Arc<dyn ManifestProvider>>,
    hot: Option<watch::Receiver<HotStatus>>,
    pub(super) cache: ResourceCache,
    pub(super) loading: LoadingRoutes,
    pub(super) bus: Bus,
    subs: Arc<SubscriberSet>,
    read_cache: Option<ReadCache<PageModule>>,
    runtime_token: CancellationToken,
}

/// Collaborators assembled by the builder.
pub(super) struct LoaderParts {
    pub cfg: LoaderConfig,
    pub host: Arc<dyn Host>,
    pub caps: Capabilities,
    pub manifest: Option<Arc<dyn ManifestProvider>>,
    pub hot: Option<watch::Receiver<HotStatus>>,
    pub bus: Bus,
    pub subs: Arc<SubscriberSet>,
    pub read_cache: Option<ReadCache<PageModule>>,
    pub runtime_token: CancellationToken,
}

impl PageLoader {
    /// Starts building a loader for `cfg` on top of `host`.
    pub fn builder(cfg: LoaderConfig, host: Arc<dyn Host>) -> PageLoaderBuilder {
        PageLoaderBuilder::new(cfg, host)
    }

    pub(super) fn new_internal(parts: LoaderParts) -> Self {
        Self {
            urls: parts.cfg.script_urls(),
            cfg: parts.cfg,
            host: parts.host,
            caps: parts.caps,
            manifest: parts.manifest,
            hot: parts.hot,
            cache: ResourceCache::new(),
            loading: LoadingRoutes::new(),
            bus: parts.bus,
            subs: parts.subs,
            read_cache: parts.read_cache,
            runtime_token: parts.runtime_token,
        }
    }

    /// Loader configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.cfg
    }

    /// Capabilities the loader was built with.
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Snapshot of the cache entry for `route`, if it was ever requested or registered.
    pub fn entry(&self, route: &str) -> Result<Option<CacheEntry>, InvalidRouteError> {
        let key = RouteKey::parse(route)?;
        Ok(self.cache.get(&key))
    }

    /// True if a fetch was dispatched for `route`.
    pub fn is_loading(&self, route: &RouteKey) -> bool {
        self.loading.contains(route)
    }

    /// Subscribes to lifecycle events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Number of user subscribers attached to the lifecycle bus.
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    /// Stops the lifecycle listener. Pending loads are unaffected.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Loads the page module of `route`.
    ///
    /// Concurrent calls for the same route share one fetch and observe the same outcome.
    /// A route that already finished resolves without touching the network.
    pub async fn load_page_script(self: &Arc<Self>, route: &str) -> Result<LoadedPage, LoadError> {
        let key = RouteKey::parse(route)?;

        let (tx, rx) = oneshot::channel::<PageOutcome>();
        let tx = Mutex::new(Some(tx));
        let waiter = move |outcome: &PageOutcome| {
            if let Some(tx) = tx.lock().take() {
                let _ = tx.send(outcome.clone());
            }
        };

        if let Join::Finished(outcome) = self.cache.join(&key, waiter) {
            self.publish(Event::new(EventKind::CacheHit).with_route(key.clone()));
            return outcome;
        }
        self.publish(Event::new(EventKind::RouteRequested).with_route(key.clone()));

        if self.host.has_page_marker(&key) {
            debug!(route = %key, "page delivered out of band, waiting for registration");
            self.publish(Event::new(EventKind::OutOfBandDetected).with_route(key.clone()));
        } else if self.loading.claim(&key) {
            self.dispatch(key.clone());
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(LoadError::Closed {
                route: key.to_string(),
            }),
        }
    }

    /// Loads `route` and returns only its page export.
    pub async fn load_page(self: &Arc<Self>, route: &str) -> Result<Export, LoadError> {
        self.load_page_script(route).await.map(|loaded| loaded.page)
    }

    /// Registers the module of `route`; called when a page script is evaluated.
    ///
    /// `thunk` runs at most once. An error or a panic inside it becomes the route's
    /// failure outcome. In development mode the registration waits until the hot-reload
    /// coordinator is idle.
    ///
    /// Must be called within a Tokio runtime: a deferred registration is spawned onto it.
    pub fn register<F>(self: &Arc<Self>, route: &str, thunk: F) -> Result<(), InvalidRouteError>
    where
        F: FnOnce() -> Result<PageModule, BoxError> + Send + 'static,
    {
        let key = RouteKey::parse(route)?;

        if let Some(mut hot) = self.busy_hot_status() {
            let status = *hot.borrow();
            debug!(route = %key, %status, "waiting for hot reload to become idle");
            self.publish(
                Event::new(EventKind::RegistrationDeferred)
                    .with_route(key.clone())
                    .with_reason(status.as_label()),
            );

            let loader = Arc::clone(self);
            tokio::spawn(async move {
                if hot.wait_for(HotStatus::is_idle).await.is_err() {
                    debug!(route = %key, "hot reload status closed, registering");
                }
                loader.run_registration(key, thunk);
            });
            return Ok(());
        }

        self.run_registration(key, thunk);
        Ok(())
    }

    /// Receiver to wait on when registrations must be deferred.
    fn busy_hot_status(&self) -> Option<watch::Receiver<HotStatus>> {
        if !self.cfg.is_development() {
            return None;
        }
        let hot = self.hot.as_ref()?;
        if hot.borrow().is_idle() {
            return None;
        }
        Some(hot.clone())
    }

    fn run_registration<F>(&self, key: RouteKey, thunk: F)
    where
        F: FnOnce() -> Result<PageModule, BoxError>,
    {
        let outcome = match catch_unwind(AssertUnwindSafe(thunk)) {
            Ok(Ok(module)) => Ok(LoadedPage::from_module(module)),
            Ok(Err(err)) => Err(LoadError::Init {
                route: key.to_string(),
                error: err.to_string(),
            }),
            Err(panic) => Err(LoadError::Init {
                route: key.to_string(),
                error: panic_message(panic.as_ref()),
            }),
        };
        self.finish(&key, outcome);
    }

    /// Stores the terminal outcome of `key` and reports it.
    pub(super) fn finish(&self, key: &RouteKey, outcome: PageOutcome) {
        match self.cache.complete(key, outcome.clone()) {
            Completion::AlreadyFinished => {
                let label = match &outcome {
                    Ok(_) => "success",
                    Err(err) => err.as_label(),
                };
                warn!(route = %key, outcome = label, "route already finished, completion ignored");
                self.publish(
                    Event::new(EventKind::DuplicateCompletion)
                        .with_route(key.clone())
                        .with_reason(label),
                );
            }
            Completion::Completed { notified } => match outcome {
                Ok(loaded) => {
                    debug!(route = %key, notified, "route registered");
                    if let Some(read_cache) = &self.read_cache {
                        read_cache.write(key.as_str(), || loaded.module);
                    }
                    self.publish(Event::new(EventKind::RouteRegistered).with_route(key.clone()));
                }
                Err(err) => {
                    debug!(route = %key, notified, error = %err, "route failed");
                    self.publish(
                        Event::new(EventKind::RouteFailed)
                            .with_route(key.clone())
                            .with_reason(err.to_string()),
                    );
                }
            },
        }
    }

    pub(super) fn publish(&self, event: Event) {
        self.bus.publish(event);
    }

    /// True when page scripts are requested as ES modules.
    pub(super) fn module_scripts(&self) -> bool {
        self.cfg.modern_build && self.caps.module_scripts
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "page initializer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Mode;
    use crate::error::PAGE_LOAD_ERROR;
    use crate::host::mock::MockHost;
    use crate::host::{BuildManifest, DeferredManifest, ScriptKind, StaticManifest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn loader(cfg: LoaderConfig, host: &Arc<MockHost>) -> Arc<PageLoader> {
        PageLoader::builder(cfg, host.clone()).build()
    }

    /// Page scripts "evaluate" by registering a module holding the route name.
    fn auto_register(host: &Arc<MockHost>, loader: &Arc<PageLoader>) {
        let weak = Arc::downgrade(loader);
        host.on_page(move |req| {
            if let Some(loader) = weak.upgrade() {
                let name = req.route.to_string();
                loader
                    .register(req.route.as_str(), move || Ok(PageModule::new(name)))
                    .unwrap();
            }
        });
    }

    fn page_name(loaded: &LoadedPage) -> &str {
        loaded.page_as::<String>().unwrap()
    }

    #[tokio::test]
    async fn test_invalid_route_is_rejected_and_not_cached() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);

        let err = loader.load_page_script("about").await.unwrap_err();
        assert_eq!(err.as_label(), "load_invalid_route");
        assert!(loader.cache.is_empty());
        assert!(host.injected().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_fetch() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);

        let a = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_page_script("/about").await }
        });
        let b = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_page_script("/about/").await }
        });

        while !matches!(
            loader.cache.get(&RouteKey::parse("/about").unwrap()),
            Some(CacheEntry::Pending { listeners: 2, .. })
        ) {
            tokio::task::yield_now().await;
        }
        assert_eq!(host.injected_urls(), ["/_next/static/b/pages/about.js"]);

        loader
            .register("/about", || Ok(PageModule::new("about".to_string())))
            .unwrap();

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&a.page, &b.page));
        assert_eq!(host.injected().len(), 1);
    }

    #[tokio::test]
    async fn test_finished_route_resolves_without_fetch() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);
        auto_register(&host, &loader);

        let first = loader.load_page_script("/blog").await.unwrap();
        let second = loader.load_page_script("/blog/index").await.unwrap();

        assert_eq!(page_name(&first), "/blog");
        assert!(Arc::ptr_eq(&first.page, &second.page));
        assert_eq!(host.injected().len(), 1);
    }

    #[tokio::test]
    async fn test_root_route_uses_index_script() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);
        auto_register(&host, &loader);

        let page = loader.load_page("/index").await.unwrap();
        assert_eq!(page.downcast_ref::<String>().map(String::as_str), Some("/"));
        assert_eq!(host.injected_urls(), ["/_next/static/b/pages/index.js"]);
    }

    #[tokio::test]
    async fn test_dependencies_fetched_before_page() {
        let host = MockHost::new();
        let cfg = LoaderConfig {
            granular_chunks: true,
            ..LoaderConfig::new("b")
        };
        let manifest = BuildManifest::new()
            .with_page("/blog/post-1", ["chunk-a.js", "styles.css", "present.js"]);
        host.add_script("/_next/present.js");
        let loader = PageLoader::builder(cfg, host.clone())
            .with_manifest(Arc::new(StaticManifest::new(manifest)))
            .build();
        auto_register(&host, &loader);

        loader.load_page_script("/blog/post-1").await.unwrap();

        let injected = host.injected();
        let urls: Vec<_> = injected.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            ["/_next/chunk-a.js", "/_next/static/b/pages/blog/post-1.js"]
        );
        assert_eq!(injected[0].kind, ScriptKind::Dependency);
        assert_eq!(injected[1].kind, ScriptKind::Page);
    }

    #[tokio::test]
    async fn test_dispatch_waits_for_manifest() {
        let host = MockHost::new();
        let cfg = LoaderConfig {
            granular_chunks: true,
            ..LoaderConfig::new("b")
        };
        let (publisher, deferred) = DeferredManifest::channel();
        let loader = PageLoader::builder(cfg, host.clone())
            .with_manifest(Arc::new(deferred))
            .build();
        auto_register(&host, &loader);

        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_page_script("/a").await }
        });
        while loader.entry("/a").unwrap().is_none() {
            tokio::task::yield_now().await;
        }
        assert!(host.injected().is_empty());

        publisher.publish(BuildManifest::new().with_page("/a", ["dep.js"]));
        pending.await.unwrap().unwrap();
        assert_eq!(
            host.injected_urls(),
            ["/_next/dep.js", "/_next/static/b/pages/a.js"]
        );
    }

    #[tokio::test]
    async fn test_thunk_error_is_cached_failure() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);
        let weak = Arc::downgrade(&loader);
        host.on_page(move |req| {
            if let Some(loader) = weak.upgrade() {
                loader
                    .register(req.route.as_str(), || Err("boom".into()))
                    .unwrap();
            }
        });

        let err = loader.load_page_script("/broken").await.unwrap_err();
        assert!(matches!(&err, LoadError::Init { error, .. } if error.contains("boom")));

        let again = loader.load_page_script("/broken").await.unwrap_err();
        assert_eq!(err, again);
        assert_eq!(host.injected().len(), 1);
    }

    #[tokio::test]
    async fn test_thunk_panic_becomes_failure() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);

        loader
            .register("/p", || -> Result<PageModule, BoxError> { panic!("kaboom") })
            .unwrap();

        let err = loader.load_page_script("/p").await.unwrap_err();
        assert!(matches!(err, LoadError::Init { error, .. } if error == "kaboom"));
    }

    #[tokio::test]
    async fn test_fetch_failure_reaches_every_waiter() {
        let host = MockHost::new();
        host.fail_url("/_next/static/b/pages/down.js");
        let loader = loader(LoaderConfig::new("b"), &host);
        let mut events = loader.events();

        let err = loader.load_page_script("/down").await.unwrap_err();
        assert_eq!(
            err,
            LoadError::Fetch {
                url: "/_next/static/b/pages/down.js".into(),
                code: PAGE_LOAD_ERROR,
            }
        );
        assert_eq!(loader.load_page_script("/down").await.unwrap_err(), err);

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::FetchFailed));
        assert!(kinds.contains(&EventKind::RouteFailed));
        assert!(kinds.contains(&EventKind::CacheHit));
    }

    #[tokio::test]
    async fn test_dependency_failure_fails_the_route() {
        let host = MockHost::new();
        host.fail_url("/_next/chunk-a.js");
        let cfg = LoaderConfig {
            granular_chunks: true,
            ..LoaderConfig::new("b")
        };
        let loader = PageLoader::builder(cfg, host.clone())
            .with_manifest(Arc::new(StaticManifest::new(
                BuildManifest::new().with_page("/blog", ["chunk-a.js"]),
            )))
            .build();
        let mut events = loader.events();

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let loader = loader.clone();
                tokio::spawn(async move { loader.load_page_script("/blog").await })
            })
            .collect();
        let expected = LoadError::Fetch {
            url: "/_next/chunk-a.js".into(),
            code: PAGE_LOAD_ERROR,
        };
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap().unwrap_err(), expected);
        }

        loader
            .register("/blog", || Ok(PageModule::new("late".to_string())))
            .unwrap();
        assert_eq!(loader.load_page_script("/blog").await.unwrap_err(), expected);

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::FetchFailed));
        assert!(kinds.contains(&EventKind::DuplicateCompletion));
    }

    #[tokio::test]
    async fn test_out_of_band_page_is_not_fetched() {
        let host = MockHost::new();
        host.mark_page("/ssr");
        let loader = loader(LoaderConfig::new("b"), &host);

        let pending = tokio::spawn({
            let loader = loader.clone();
            async move { loader.load_page_script("/ssr").await }
        });
        while loader.entry("/ssr").unwrap().is_none() {
            tokio::task::yield_now().await;
        }

        loader
            .register("/ssr", || Ok(PageModule::new("ssr".to_string())))
            .unwrap();
        pending.await.unwrap().unwrap();
        assert!(host.injected().is_empty());
        assert!(!loader.is_loading(&RouteKey::parse("/ssr").unwrap()));
    }

    #[tokio::test]
    async fn test_second_registration_is_ignored() {
        let host = MockHost::new();
        let loader = loader(LoaderConfig::new("b"), &host);
        let calls = Arc::new(AtomicUsize::new(0));

        for value in ["first", "second"] {
            let calls = Arc::clone(&calls);
            loader
                .register("/dup", move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(PageModule::new(value))
                })
                .unwrap();
        }

        let loaded = loader.load_page_script("/dup").await.unwrap();
        assert_eq!(loaded.page_as::<&str>(), Some(&"first"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_registration_waits_for_idle_hot_reload() {
        let host = MockHost::new();
        let cfg = LoaderConfig {
            mode: Mode::Development,
            ..LoaderConfig::new("b")
        };
        let (hot_tx, hot_rx) = watch::channel(HotStatus::Apply);
        let loader = PageLoader::builder(cfg, host.clone())
            .with_hot_reload(hot_rx)
            .build();

        loader
            .register("/hot", || Ok(PageModule::new("hot")))
            .unwrap();
        tokio::task::yield_now().await;
        assert!(loader.entry("/hot").unwrap().is_none());

        hot_tx.send_replace(HotStatus::Idle);
        let loaded = loader.load_page_script("/hot").await.unwrap();
        assert_eq!(loaded.page_as::<&str>(), Some(&"hot"));
    }

    #[tokio::test]
    async fn test_production_ignores_hot_status() {
        let host = MockHost::new();
        let (_hot_tx, hot_rx) = watch::channel(HotStatus::Check);
        let loader = PageLoader::builder(LoaderConfig::new("b"), host.clone())
            .with_hot_reload(hot_rx)
            .build();

        loader.register("/p", || Ok(PageModule::new(1u8))).unwrap();
        assert!(loader.entry("/p").unwrap().unwrap().is_finished());
    }

    #[tokio::test]
    async fn test_registration_writes_read_cache() {
        let host = MockHost::new();
        let modules = ReadCache::<PageModule>::new();
        let loader = PageLoader::builder(LoaderConfig::new("b"), host.clone())
            .with_read_cache(modules.clone())
            .build();

        loader
            .register("/about/", || Ok(PageModule::new("about")))
            .unwrap();
        let module = modules.read("/about").ready().unwrap();
        assert_eq!(module.page().downcast_ref::<&str>(), Some(&"about"));
    }

    #[tokio::test]
    async fn test_module_build_rewrites_page_url_only() {
        let host = MockHost::new();
        let cfg = LoaderConfig {
            granular_chunks: true,
            modern_build: true,
            cross_origin: Some("anonymous".into()),
            ..LoaderConfig::new("b")
        };
        let loader = PageLoader::builder(cfg, host.clone())
            .with_capabilities(Capabilities {
                module_scripts: true,
                ..Capabilities::default()
            })
            .with_manifest(Arc::new(StaticManifest::new(
                BuildManifest::new().with_page("/m", ["dep.module.js"]),
            )))
            .build();
        auto_register(&host, &loader);

        loader.load_page("/m").await.unwrap();
        let injected = host.injected();
        assert_eq!(injected[0].url, "/_next/dep.module.js");
        assert_eq!(injected[1].url, "/_next/static/b/pages/m.module.js");
        assert!(injected.iter().all(|r| r.module));
        assert!(
            injected
                .iter()
                .all(|r| r.cross_origin.as_deref() == Some("anonymous"))
        );
    }
}
