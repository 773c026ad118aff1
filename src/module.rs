//! # Page module values.
//!
//! A page module is whatever the registration thunk of a delivered script produced.
//! The loader does not interpret it beyond picking the page export:
//!
//! ```text
//! PageModule { namespace, default: Some(d) }  ─► page = d
//! PageModule { namespace, default: None }     ─► page = namespace
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased, shareable export value.
pub type Export = Arc<dyn Any + Send + Sync>;

/// A loaded page module: its namespace and optional default export.
#[derive(Clone)]
pub struct PageModule {
    namespace: Export,
    default: Option<Export>,
}

impl PageModule {
    /// Creates a module whose namespace is also its page export.
    pub fn new<V: Any + Send + Sync>(namespace: V) -> Self {
        Self {
            namespace: Arc::new(namespace),
            default: None,
        }
    }

    /// Creates a module from an already shared namespace value.
    pub fn from_export(namespace: Export) -> Self {
        Self {
            namespace,
            default: None,
        }
    }

    /// Attaches a default export, which then becomes the page export.
    pub fn with_default<V: Any + Send + Sync>(mut self, default: V) -> Self {
        self.default = Some(Arc::new(default));
        self
    }

    /// The module namespace.
    pub fn namespace(&self) -> &Export {
        &self.namespace
    }

    /// The default export, if any.
    pub fn default_export(&self) -> Option<&Export> {
        self.default.as_ref()
    }

    /// The page export: the default export when present, the namespace otherwise.
    pub fn page(&self) -> Export {
        Arc::clone(self.default.as_ref().unwrap_or(&self.namespace))
    }
}

impl fmt::Debug for PageModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageModule")
            .field("has_default", &self.default.is_some())
            .finish_non_exhaustive()
    }
}

/// Successful result of a page load.
#[derive(Clone, Debug)]
pub struct LoadedPage {
    /// The page export (see [`PageModule::page`]).
    pub page: Export,
    /// The full module as registered.
    pub module: PageModule,
}

impl LoadedPage {
    pub(crate) fn from_module(module: PageModule) -> Self {
        Self {
            page: module.page(),
            module,
        }
    }

    /// Downcasts the page export.
    pub fn page_as<V: Any>(&self) -> Option<&V> {
        self.page.downcast_ref::<V>()
    }
}
