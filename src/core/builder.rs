use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, watch};
use tokio_util::sync::CancellationToken;

use super::loader::{LoaderParts, PageLoader};
use crate::{
    core::{HotStatus, LoaderConfig},
    events::Bus,
    host::{Capabilities, Host, ManifestProvider},
    module::PageModule,
    resource::ReadCache,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a [`PageLoader`] with optional collaborators.
pub struct PageLoaderBuilder {
    cfg: LoaderConfig,
    host: Arc<dyn Host>,
    caps: Capabilities,
    manifest: Option<Arc<dyn ManifestProvider>>,
    hot: Option<watch::Receiver<HotStatus>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    read_cache: Option<ReadCache<PageModule>>,
}

impl PageLoaderBuilder {
    /// Creates a new builder with the given configuration and host.
    pub fn new(cfg: LoaderConfig, host: Arc<dyn Host>) -> Self {
        Self {
            cfg,
            host,
            caps: Capabilities::default(),
            manifest: None,
            hot: None,
            subscribers: Vec::new(),
            read_cache: None,
        }
    }

    /// Sets the environment capabilities probed by the embedder.
    pub fn with_capabilities(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    /// Sets the build manifest lookup used when granular chunks are enabled.
    ///
    /// Without a provider every route has no dependencies.
    pub fn with_manifest(mut self, manifest: Arc<dyn ManifestProvider>) -> Self {
        self.manifest = Some(manifest);
        self
    }

    /// Sets the hot-reload coordinator status, consulted in development mode only.
    pub fn with_hot_reload(mut self, status: watch::Receiver<HotStatus>) -> Self {
        self.hot = Some(status);
        self
    }

    /// Sets lifecycle event subscribers.
    ///
    /// Subscribers receive loader events (requests, dispatches, completions, prefetch
    /// decisions) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Writes every successful registration into `cache`, keyed by route.
    pub fn with_read_cache(mut self, cache: ReadCache<PageModule>) -> Self {
        self.read_cache = Some(cache);
        self
    }

    /// Builds and returns the loader.
    ///
    /// Must be called within a Tokio runtime: subscriber workers and the lifecycle
    /// listener are spawned here.
    pub fn build(self) -> Arc<PageLoader> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        let runtime_token = CancellationToken::new();

        subscriber_listener(&bus, Arc::clone(&subs), runtime_token.clone());

        Arc::new(PageLoader::new_internal(LoaderParts {
            cfg: self.cfg,
            host: self.host,
            caps: self.caps,
            manifest: self.manifest,
            hot: self.hot,
            bus,
            subs,
            read_cache: self.read_cache,
            runtime_token,
        }))
    }
}

/// Forwards bus events to the subscriber set until the token is cancelled or the bus closes.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>, token: CancellationToken) {
    if set.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                received = rx.recv() => match received {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "lifecycle listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });
}
