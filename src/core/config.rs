//! # Loader configuration.
//!
//! Provides [`LoaderConfig`] centralized settings for one [`PageLoader`](crate::PageLoader).
//!
//! Config is used in two places:
//! 1. **Loader creation**: `PageLoader::builder(config, host)`
//! 2. **URL construction**: `build_id` and `asset_prefix` feed [`ScriptUrls`]
//!
//! ## Sentinel values
//! - `cross_origin = None` → no `crossorigin` attribute on injected scripts/preloads
//! - `asset_prefix = ""` → scripts are served from the document origin root

use std::sync::Arc;

use crate::route::ScriptUrls;

/// Build mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Hot reloading is active; registrations wait for the coordinator to be idle.
    Development,
    /// Registrations complete immediately.
    #[default]
    Production,
}

/// Configuration of a page loader.
///
/// ## Field semantics
/// - `build_id`: identifier of the deployed build, part of every page script URL
/// - `asset_prefix`: prefix prepended to every script URL (CDN origin or base path)
/// - `granular_chunks`: resolve manifest dependencies before fetching a page
/// - `modern_build`: request page scripts as ES modules when the host supports them
/// - `mode`: development or production
/// - `cross_origin`: value of the `crossorigin` attribute (`None` = omitted)
/// - `bus_capacity`: lifecycle event bus ring buffer size (min 1; clamped by Bus)
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct LoaderConfig {
    /// Identifier of the deployed build.
    pub build_id: String,

    /// Prefix prepended to every script URL.
    pub asset_prefix: String,

    /// Resolve manifest dependencies before fetching a page.
    ///
    /// When disabled the manifest is never consulted and pages are fetched alone.
    pub granular_chunks: bool,

    /// Request page scripts as ES modules when the host supports module scripts.
    pub modern_build: bool,

    /// Development or production.
    pub mode: Mode,

    /// Value of the `crossorigin` attribute for scripts and preloads.
    pub cross_origin: Option<String>,

    /// Capacity of the lifecycle event bus.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,
}

impl LoaderConfig {
    /// Creates a production config for `build_id` with every other field defaulted.
    pub fn new(build_id: impl Into<String>) -> Self {
        Self {
            build_id: build_id.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the `crossorigin` value as a shared string.
    #[inline]
    pub fn cross_origin(&self) -> Option<Arc<str>> {
        self.cross_origin.as_deref().map(Arc::from)
    }

    /// True in development mode.
    #[inline]
    pub fn is_development(&self) -> bool {
        self.mode == Mode::Development
    }

    /// URL builder for this build.
    pub fn script_urls(&self) -> ScriptUrls {
        ScriptUrls::new(self.asset_prefix.clone(), self.build_id.clone())
    }
}

impl Default for LoaderConfig {
    /// Default configuration:
    ///
    /// - `build_id = "development"`
    /// - `asset_prefix = ""`
    /// - `granular_chunks = false`
    /// - `modern_build = false`
    /// - `mode = Production`
    /// - `cross_origin = None`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            build_id: "development".to_string(),
            asset_prefix: String::new(),
            granular_chunks: false,
            modern_build: false,
            mode: Mode::Production,
            cross_origin: None,
            bus_capacity: 1024,
        }
    }
}
