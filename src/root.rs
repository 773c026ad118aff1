//! # Render root.
//!
//! A render root owns the read cache its components suspend on and the root data
//! payload embedded in the initial document.
//!
//! ```text
//!             ┌──────────── RenderRoot ─────────────┐
//! payload ───►│ RootData { page, props, query }      │
//!             │ ReadCache<PageModule>                │◄── page_writer() ◄── PageLoader
//!             └──┬───────────────┬──────────────────┘      (successful registrations)
//!                ▼               ▼
//!            app()          component()                LazyPage::read() ─► Ready / NotReady
//!          ("/_app")      (RootData::page)
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RootDataError;
use crate::module::{Export, PageModule};
use crate::resource::{Read, ReadCache, suspend};
use crate::route::RouteKey;

/// Name under which the application shell registers.
pub const APP_PAGE: &str = "/_app";

/// Data embedded by the server in the initial document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RootData {
    /// Route of the server-rendered page.
    #[serde(default)]
    pub page: Option<String>,
    /// Initial props of the page.
    #[serde(default)]
    pub props: Map<String, Value>,
    /// Query parameters of the initial request.
    #[serde(default)]
    pub query: Map<String, Value>,
}

impl RootData {
    /// Parses the text content of the root data element.
    ///
    /// A missing or empty payload yields the defaults.
    pub fn parse(payload: Option<&str>) -> Result<Self, RootDataError> {
        match payload.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(text) => Ok(serde_json::from_str(text)?),
        }
    }
}

/// Renderer-side state of one application root.
#[derive(Clone)]
pub struct RenderRoot {
    data: Arc<RootData>,
    modules: ReadCache<PageModule>,
}

impl RenderRoot {
    /// Creates a root with an empty read cache.
    pub fn new(data: RootData) -> Self {
        Self {
            data: Arc::new(data),
            modules: ReadCache::new(),
        }
    }

    /// Creates a root from the raw root data payload.
    pub fn from_payload(payload: Option<&str>) -> Result<Self, RootDataError> {
        RootData::parse(payload).map(Self::new)
    }

    /// Root data payload.
    pub fn data(&self) -> &RootData {
        &self.data
    }

    /// Write side of the read cache, handed to the loader.
    pub fn page_writer(&self) -> ReadCache<PageModule> {
        self.modules.clone()
    }

    /// Lazy handle to the page registered as `name`.
    pub fn lazy_page(&self, name: &str) -> LazyPage {
        let name = match RouteKey::parse(name) {
            Ok(key) => Arc::from(key),
            Err(_) => Arc::from(name),
        };
        LazyPage {
            name,
            modules: self.modules.clone(),
        }
    }

    /// Lazy handle to the application shell.
    pub fn app(&self) -> LazyPage {
        self.lazy_page(APP_PAGE)
    }

    /// Lazy handle to the server-rendered page, if the payload named one.
    pub fn component(&self) -> Option<LazyPage> {
        self.data.page.as_deref().map(|page| self.lazy_page(page))
    }
}

/// A page component that suspends until its module is written.
#[derive(Clone)]
pub struct LazyPage {
    name: Arc<str>,
    modules: ReadCache<PageModule>,
}

impl LazyPage {
    /// Cache key of the page.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Page export, or the handle to wait on.
    pub fn read(&self) -> Read<Export> {
        self.modules.read(&self.name).map(|module| module.page())
    }

    /// Waits until the page export is available.
    pub async fn load(&self) -> Export {
        suspend(|| self.read()).await
    }
}
