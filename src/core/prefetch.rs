//! # Speculative prefetching.
//!
//! Prefetching never fails and never writes the cache directly; the only way it can
//! affect the cache is the full-load fallback, which goes through
//! [`PageLoader::load_page`] and its deduplication.
//!
//! ```text
//! prefetch(route, is_dependency)
//!   ├─ invalid route                          ─► ignored
//!   ├─ requested before / preload or marker   ─► PrefetchSkipped
//!   ├─ save-data or 2g connection             ─► PrefetchSkipped
//!   ├─ granular && page ─► prefetch each manifest dependency first
//!   ├─ preload supported ─► host.preload(url)  ─► PrefetchIssued
//!   ├─ dependency        ─► stop
//!   └─ page              ─► (document loaded) load_page(route), result discarded
//! ```

use std::sync::Arc;

use tracing::debug;

use super::PageLoader;
use crate::events::{Event, EventKind};
use crate::host::{PreloadRequest, ReadyState};
use crate::route::{RouteKey, encode_uri};

impl PageLoader {
    /// Speculatively loads `route` in the background.
    ///
    /// `is_dependency` marks `route` as a dependency path (`/_next/...`) rather than a
    /// page route.
    pub async fn prefetch(self: &Arc<Self>, route: &str, is_dependency: bool) {
        let key = match RouteKey::parse(route) {
            Ok(key) => key,
            Err(err) => {
                debug!(error = %err, "prefetch ignored");
                return;
            }
        };

        if is_dependency {
            self.prefetch_dependency(&key);
            return;
        }

        let url = self.urls.page(&key, self.module_scripts());
        if self.cache.get(&key).is_some() {
            self.skip_prefetch(&key, "cached");
            return;
        }
        if !self.should_prefetch(&key, &url) {
            return;
        }

        if self.cfg.granular_chunks {
            self.prefetch_dependencies(&key).await;
        }

        if self.caps.preload {
            self.issue_preload(&key, &url);
            return;
        }

        self.publish(Event::new(EventKind::PrefetchFallback).with_route(key.clone()));
        if self.host.ready_state() != ReadyState::Complete {
            self.host.document_loaded().await;
        }
        if let Err(err) = self.load_page(key.as_str()).await {
            debug!(route = %key, error = %err, "prefetch load failed");
        }
    }

    async fn prefetch_dependencies(&self, key: &RouteKey) {
        let Some(provider) = &self.manifest else {
            return;
        };
        let manifest = provider.ready().await;
        for entry in manifest.dependencies(key.as_str()) {
            match RouteKey::parse(&self.urls.dependency(entry)) {
                Ok(dep) => self.prefetch_dependency(&dep),
                Err(err) => debug!(error = %err, "dependency prefetch ignored"),
            }
        }
    }

    fn prefetch_dependency(&self, key: &RouteKey) {
        let url = self.urls.prefixed(key.as_str());
        if !self.should_prefetch(key, &url) {
            return;
        }
        // Without preload support the page load fetches its dependencies itself.
        if self.caps.preload {
            self.issue_preload(key, &url);
        }
    }

    /// Checks environment markers and connection hints; publishes the skip reason.
    fn should_prefetch(&self, key: &RouteKey, url: &str) -> bool {
        if self.host.has_preload(url) || self.host.has_page_marker(key) {
            self.skip_prefetch(key, "marker_present");
            return false;
        }
        if self.caps.is_constrained() {
            self.skip_prefetch(key, "constrained_network");
            return false;
        }
        true
    }

    fn issue_preload(&self, key: &RouteKey, url: &str) {
        self.host.preload(&PreloadRequest {
            href: encode_uri(url),
            cross_origin: self.cfg.cross_origin(),
        });
        self.publish(
            Event::new(EventKind::PrefetchIssued)
                .with_route(key.clone())
                .with_url(url),
        );
    }

    fn skip_prefetch(&self, key: &RouteKey, reason: &'static str) {
        debug!(route = %key, reason, "prefetch skipped");
        self.publish(
            Event::new(EventKind::PrefetchSkipped)
                .with_route(key.clone())
                .with_reason(reason),
        );
    }
}
