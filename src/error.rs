//! Error types used by the page loader and its collaborators.
//!
//! This module defines the error taxonomy:
//!
//! - [`InvalidRouteError`] — a route string that cannot be normalized (never cached).
//! - [`LoadError`] — the failure outcome of a page load; this is what waiters receive
//!   and what a `Finished(Failure)` cache entry stores.
//! - [`FetchError`] — a transport failure reported by the [`Host`](crate::Host).
//! - [`RootDataError`] — a malformed root data payload.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// Stable error code attached to transport failures of injected scripts.
pub const PAGE_LOAD_ERROR: &str = "PAGE_LOAD_ERROR";

/// Error returned by a page registration thunk.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// # Route string rejected by the normalizer.
///
/// Raised synchronously by [`normalize_route`](crate::normalize_route) when the input
/// does not begin with a `/`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("route name should start with a \"/\", got \"{route}\"")]
pub struct InvalidRouteError {
    /// The rejected input, verbatim.
    pub route: String,
}

impl InvalidRouteError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        "invalid_route"
    }
}

/// # Failure outcome of a page load.
///
/// Transport and initialization failures are normalized into this type, cached as the
/// route's terminal outcome, and cloned to every current and future requester.
///
/// # Example
/// ```
/// use pageloader::LoadError;
///
/// let err = LoadError::Fetch { url: "/_next/a.js".into(), code: pageloader::PAGE_LOAD_ERROR };
/// assert_eq!(err.as_label(), "load_fetch_failed");
/// assert_eq!(err.code(), Some("PAGE_LOAD_ERROR"));
/// ```
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The requested route could not be normalized.
    #[error(transparent)]
    InvalidRoute(#[from] InvalidRouteError),

    /// A script injected for the route failed to load.
    #[error("error loading script {url}")]
    Fetch {
        /// URL of the script that failed (page or dependency).
        url: String,
        /// Stable error code, see [`PAGE_LOAD_ERROR`].
        code: &'static str,
    },

    /// The page module was delivered but its registration thunk failed.
    #[error("page \"{route}\" failed to initialize: {error}")]
    Init {
        /// Normalized route of the page.
        route: String,
        /// The underlying error message.
        error: String,
    },

    /// The loader was dropped before the route completed.
    #[error("loader closed before \"{route}\" completed")]
    Closed {
        /// Normalized route of the page.
        route: String,
    },
}

impl LoadError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::InvalidRoute(_) => "load_invalid_route",
            LoadError::Fetch { .. } => "load_fetch_failed",
            LoadError::Init { .. } => "load_init_failed",
            LoadError::Closed { .. } => "load_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::InvalidRoute(e) => format!("invalid route: {}", e.route),
            LoadError::Fetch { url, code } => format!("fetch {url}: {code}"),
            LoadError::Init { route, error } => format!("init {route}: {error}"),
            LoadError::Closed { route } => format!("closed: {route}"),
        }
    }

    /// Returns the stable transport error code, if this is a fetch failure.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            LoadError::Fetch { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// # Transport failure reported by the host for an injected script.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("transport failure: {reason}")]
pub struct FetchError {
    /// Host-specific description of the failure.
    pub reason: String,
}

impl FetchError {
    /// Creates a fetch error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// # Root data payload could not be decoded.
#[derive(Error, Debug)]
pub enum RootDataError {
    /// The payload is not valid JSON or does not match `{page, props, query}`.
    #[error("malformed root data: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl RootDataError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RootDataError::Malformed(_) => "root_data_malformed",
        }
    }
}
