//! In-memory [`Host`] for unit tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{self, BoxFuture, FutureExt};
use parking_lot::Mutex;
use tokio::sync::watch;

use super::{Host, PreloadRequest, ReadyState, ScriptKind, ScriptRequest};
use crate::error::FetchError;
use crate::route::RouteKey;

type PageHook = Arc<dyn Fn(&ScriptRequest) + Send + Sync>;

/// Records every interaction; page scripts "evaluate" through an optional hook.
pub(crate) struct MockHost {
    injected: Mutex<Vec<ScriptRequest>>,
    preloads: Mutex<Vec<PreloadRequest>>,
    markers: Mutex<HashSet<String>>,
    scripts: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    on_page: Mutex<Option<PageHook>>,
    ready: watch::Sender<ReadyState>,
}

impl MockHost {
    pub(crate) fn new() -> Arc<Self> {
        let (ready, _) = watch::channel(ReadyState::Complete);
        Arc::new(Self {
            injected: Mutex::new(Vec::new()),
            preloads: Mutex::new(Vec::new()),
            markers: Mutex::new(HashSet::new()),
            scripts: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            on_page: Mutex::new(None),
            ready,
        })
    }

    pub(crate) fn mark_page(&self, route: &str) {
        self.markers.lock().insert(route.to_string());
    }

    pub(crate) fn add_script(&self, src: &str) {
        self.scripts.lock().push(src.to_string());
    }

    pub(crate) fn fail_url(&self, url: &str) {
        self.failing.lock().insert(url.to_string());
    }

    pub(crate) fn on_page<F>(&self, hook: F)
    where
        F: Fn(&ScriptRequest) + Send + Sync + 'static,
    {
        *self.on_page.lock() = Some(Arc::new(hook));
    }

    pub(crate) fn set_ready_state(&self, state: ReadyState) {
        self.ready.send_replace(state);
    }

    pub(crate) fn injected(&self) -> Vec<ScriptRequest> {
        self.injected.lock().clone()
    }

    pub(crate) fn injected_urls(&self) -> Vec<String> {
        self.injected.lock().iter().map(|r| r.url.clone()).collect()
    }

    pub(crate) fn preloads(&self) -> Vec<PreloadRequest> {
        self.preloads.lock().clone()
    }
}

#[async_trait]
impl Host for MockHost {
    fn inject(&self, request: ScriptRequest) -> BoxFuture<'static, Result<(), FetchError>> {
        self.injected.lock().push(request.clone());
        self.scripts.lock().push(request.url.clone());

        if self.failing.lock().contains(&request.url) {
            return future::ready(Err(FetchError::new("network error"))).boxed();
        }
        if request.kind == ScriptKind::Page {
            let hook = self.on_page.lock().clone();
            if let Some(hook) = hook {
                hook(&request);
            }
        }
        future::ready(Ok(())).boxed()
    }

    fn preload(&self, request: &PreloadRequest) {
        self.preloads.lock().push(request.clone());
    }

    fn has_page_marker(&self, route: &RouteKey) -> bool {
        self.markers.lock().contains(route.as_str())
    }

    fn has_script(&self, prefix: &str) -> bool {
        self.scripts.lock().iter().any(|s| s.starts_with(prefix))
    }

    fn has_preload(&self, prefix: &str) -> bool {
        self.preloads
            .lock()
            .iter()
            .any(|p| p.href.starts_with(prefix))
    }

    fn ready_state(&self) -> ReadyState {
        *self.ready.borrow()
    }

    async fn document_loaded(&self) {
        let mut rx = self.ready.subscribe();
        let _ = rx.wait_for(|s| *s == ReadyState::Complete).await;
    }
}
