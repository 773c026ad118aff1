//! # Fetch dispatch for a claimed route.
//!
//! ```text
//! dispatch(key)
//!   ├─ granular chunks off ─► inject(page)                       (synchronous)
//!   └─ granular chunks on  ─► spawn:
//!                               manifest.ready().await
//!                               for dep in manifest[key]:
//!                                   skip unless dep ends in ".js" and is not present
//!                                   inject(dep)
//!                               inject(page)
//!
//! inject(script) ─► host.inject(request) ─► spawn watcher:
//!                                             Err ─► finish(key, Fetch { url, code })
//! ```
//!
//! A successful fetch completes nothing by itself: the page script calls
//! [`PageLoader::register`] when it is evaluated.

use std::sync::Arc;

use tracing::debug;

use super::PageLoader;
use crate::cache::Dispatch;
use crate::error::{LoadError, PAGE_LOAD_ERROR};
use crate::events::{Event, EventKind};
use crate::host::{ScriptKind, ScriptRequest};
use crate::route::{RouteKey, encode_uri};

const SCRIPT_SUFFIX: &str = ".js";

impl PageLoader {
    /// Issues the fetches for a route claimed in the loading set.
    pub(super) fn dispatch(self: &Arc<Self>, key: RouteKey) {
        let module = self.module_scripts();
        let page_url = self.urls.page(&key, module);

        if !self.cfg.granular_chunks {
            self.cache.mark_dispatched(&key, Dispatch::Fetch);
            self.inject(key, page_url, ScriptKind::Page, module);
            return;
        }

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            let deps = loader.resolve_dependencies(&key).await;
            let dispatch = match deps.len() {
                0 => Dispatch::Fetch,
                count => Dispatch::FetchWithDependencies { count },
            };
            loader.cache.mark_dispatched(&key, dispatch);

            for url in deps {
                loader.inject(key.clone(), url, ScriptKind::Dependency, module);
            }
            loader.inject(key, page_url, ScriptKind::Page, module);
        });
    }

    /// Dependency URLs of `key` that still need to be fetched, in manifest order.
    async fn resolve_dependencies(&self, key: &RouteKey) -> Vec<String> {
        let Some(provider) = &self.manifest else {
            return Vec::new();
        };
        let manifest = provider.ready().await;
        manifest
            .dependencies(key.as_str())
            .iter()
            .map(|entry| self.urls.dependency(entry))
            .filter(|url| url.ends_with(SCRIPT_SUFFIX) && !self.host.has_script(url))
            .collect()
    }

    fn inject(self: &Arc<Self>, key: RouteKey, url: String, kind: ScriptKind, module: bool) {
        let event = match kind {
            ScriptKind::Page => EventKind::FetchDispatched,
            ScriptKind::Dependency => EventKind::DependencyDispatched,
        };
        debug!(route = %key, %url, kind = event.as_label(), "injecting script");
        self.publish(
            Event::new(event)
                .with_route(key.clone())
                .with_url(url.as_str()),
        );

        let request = ScriptRequest {
            src: encode_uri(&url),
            url: url.clone(),
            route: key.clone(),
            kind,
            module,
            cross_origin: self.cfg.cross_origin(),
        };
        let fetch = self.host.inject(request);

        let loader = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = fetch.await {
                debug!(route = %key, %url, reason = %err.reason, "script failed to load");
                loader.publish(
                    Event::new(EventKind::FetchFailed)
                        .with_route(key.clone())
                        .with_url(url.as_str())
                        .with_reason(err.reason),
                );
                loader.finish(
                    &key,
                    Err(LoadError::Fetch {
                        url,
                        code: PAGE_LOAD_ERROR,
                    }),
                );
            }
        });
    }
}
