//! # Environment seam.
//!
//! The loader never touches a document directly. Everything it needs from the hosting
//! environment goes through the [`Host`] trait:
//!
//! ```text
//!               ┌───────────────────────── Host ──────────────────────────┐
//! PageLoader ──►│ inject(ScriptRequest)      fetch primitive (code inject) │
//!               │ has_page_marker(route)     out-of-band delivery marker   │
//!               │ has_script(prefix)         dependency already present    │
//! Prefetcher ──►│ preload(PreloadRequest)    preload directive             │
//!               │ has_preload(prefix)        preload already issued        │
//!               │ ready_state / document_loaded                            │
//!               └──────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Capabilities`] are probed once by the embedder and handed to the loader at build
//! time; the loader never re-probes.

mod manifest;
#[cfg(test)]
pub(crate) mod mock;

pub use manifest::{
    BuildManifest, DeferredManifest, ManifestProvider, ManifestPublisher, StaticManifest,
};

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::route::RouteKey;

/// What an injected script is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// The primary page script; its evaluation calls `register`.
    Page,
    /// An auxiliary bundle listed in the build manifest.
    Dependency,
}

/// A script the host must fetch and evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    /// Unencoded script URL, used for error reporting and presence checks.
    pub url: String,
    /// Encoded `src` attribute value.
    pub src: String,
    /// Route the script is loaded for.
    pub route: RouteKey,
    /// Page script or dependency.
    pub kind: ScriptKind,
    /// Load as an ES module (`type="module"`).
    pub module: bool,
    /// Value of the `crossorigin` attribute, if configured.
    pub cross_origin: Option<Arc<str>>,
}

/// A preload directive for a script the page will likely need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadRequest {
    /// Encoded script URL to preload.
    pub href: String,
    /// Value of the `crossorigin` attribute, if configured.
    pub cross_origin: Option<Arc<str>>,
}

/// Document readiness, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    /// Still parsing.
    #[default]
    Loading,
    /// Parsed; subresources may still be loading.
    Interactive,
    /// Fully loaded.
    Complete,
}

/// Network condition hints.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnectionInfo {
    /// Effective connection class (`"slow-2g"`, `"2g"`, `"3g"`, `"4g"`).
    pub effective_type: Option<String>,
    /// The user asked for reduced data usage.
    pub save_data: bool,
}

impl ConnectionInfo {
    /// True when speculative loading should be avoided.
    pub fn is_constrained(&self) -> bool {
        self.save_data
            || self
                .effective_type
                .as_deref()
                .is_some_and(|t| t.contains("2g"))
    }
}

/// Environment features probed once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// Preload directives are supported.
    pub preload: bool,
    /// Module scripts are supported.
    pub module_scripts: bool,
    /// Connection hints, when the environment exposes them.
    pub connection: Option<ConnectionInfo>,
}

impl Capabilities {
    /// True when the connection hints say to skip speculative loading.
    pub fn is_constrained(&self) -> bool {
        self.connection
            .as_ref()
            .is_some_and(ConnectionInfo::is_constrained)
    }
}

impl Default for Capabilities {
    /// Preload supported, no module scripts, no connection hints.
    fn default() -> Self {
        Self {
            preload: true,
            module_scripts: false,
            connection: None,
        }
    }
}

/// Hosting environment of the loader.
///
/// ### Implementation requirements
/// - `inject` must not block; the returned future resolves when the script finished
///   loading (`Ok`) or failed at the transport level (`Err`).
/// - Evaluating a page script is expected to call
///   [`PageLoader::register`](crate::PageLoader::register) for its route.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Starts fetching and evaluating a script.
    fn inject(&self, request: ScriptRequest) -> BoxFuture<'static, Result<(), FetchError>>;

    /// Issues a preload directive.
    fn preload(&self, request: &PreloadRequest);

    /// True if the initial document is already delivering the page for `route`.
    fn has_page_marker(&self, route: &RouteKey) -> bool;

    /// True if a script whose source starts with `prefix` is already present.
    fn has_script(&self, prefix: &str) -> bool;

    /// True if a preload directive for `prefix` was already issued.
    fn has_preload(&self, prefix: &str) -> bool;

    /// Current document readiness.
    fn ready_state(&self) -> ReadyState;

    /// Resolves once the document finished loading.
    async fn document_loaded(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constrained_connections() {
        let slow = ConnectionInfo {
            effective_type: Some("slow-2g".into()),
            save_data: false,
        };
        let saving = ConnectionInfo {
            effective_type: Some("4g".into()),
            save_data: true,
        };
        let fast = ConnectionInfo {
            effective_type: Some("4g".into()),
            save_data: false,
        };
        assert!(slow.is_constrained());
        assert!(saving.is_constrained());
        assert!(!fast.is_constrained());
        assert!(!Capabilities::default().is_constrained());
    }
}
