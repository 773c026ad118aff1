//! # Build manifest lookup.
//!
//! The build manifest maps a route key to the ordered list of dependency bundles the
//! page needs. It usually becomes available some time after startup, so lookups go
//! through [`ManifestProvider::ready`].
//!
//! - [`StaticManifest`] is ready immediately.
//! - [`DeferredManifest`] is ready once its [`ManifestPublisher`] publishes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Route key → ordered dependency entries (relative to `/_next/`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildManifest {
    pages: HashMap<String, Vec<String>>,
}

impl BuildManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the dependency list of `route`.
    pub fn with_page<I, S>(mut self, route: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages
            .insert(route.into(), deps.into_iter().map(Into::into).collect());
        self
    }

    /// Dependencies of `route`, empty if the route is unknown.
    pub fn dependencies(&self, route: &str) -> &[String] {
        self.pages.get(route).map(Vec::as_slice).unwrap_or_default()
    }

    /// Parses the JSON form (`{"/route": ["dep.js", ...]}`).
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Asynchronous access to the build manifest.
#[async_trait]
pub trait ManifestProvider: Send + Sync + 'static {
    /// Resolves with the manifest once it is available.
    async fn ready(&self) -> Arc<BuildManifest>;
}

/// Manifest known at construction time.
#[derive(Debug, Clone, Default)]
pub struct StaticManifest(Arc<BuildManifest>);

impl StaticManifest {
    /// Wraps a manifest.
    pub fn new(manifest: BuildManifest) -> Self {
        Self(Arc::new(manifest))
    }
}

#[async_trait]
impl ManifestProvider for StaticManifest {
    async fn ready(&self) -> Arc<BuildManifest> {
        Arc::clone(&self.0)
    }
}

/// Manifest published later by the embedder.
#[derive(Debug, Clone)]
pub struct DeferredManifest {
    rx: watch::Receiver<Option<Arc<BuildManifest>>>,
}

/// Publishing side of a [`DeferredManifest`].
#[derive(Debug)]
pub struct ManifestPublisher {
    tx: watch::Sender<Option<Arc<BuildManifest>>>,
}

impl DeferredManifest {
    /// Creates a pending manifest and its publisher.
    pub fn channel() -> (ManifestPublisher, Self) {
        let (tx, rx) = watch::channel(None);
        (ManifestPublisher { tx }, Self { rx })
    }
}

impl ManifestPublisher {
    /// Makes the manifest available to every waiting and future lookup.
    pub fn publish(&self, manifest: BuildManifest) {
        self.tx.send_replace(Some(Arc::new(manifest)));
    }
}

#[async_trait]
impl ManifestProvider for DeferredManifest {
    async fn ready(&self) -> Arc<BuildManifest> {
        let mut rx = self.rx.clone();
        match rx.wait_for(Option::is_some).await {
            Ok(published) => (*published).clone().unwrap_or_default(),
            // Publisher dropped without publishing: behave as an empty manifest.
            Err(_) => Arc::default(),
        }
    }
}
