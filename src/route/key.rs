//! # Canonical route keys.
//!
//! [`RouteKey`] is the cache and dedup key for a page. It is produced only by
//! [`normalize_route`] / [`RouteKey::parse`], so every instance upholds:
//!
//! - starts with a single `/` (repeated leading separators are collapsed);
//! - no trailing `/`, except the root key `/`;
//! - no trailing `/index` segment (`/index` itself is the root).
//!
//! ```text
//! "/about"          ─► "/about"
//! "/about/"         ─► "/about"
//! "/about/index"    ─► "/about"
//! "/index"          ─► "/"
//! "/"               ─► "/"
//! "about"           ─► InvalidRouteError
//! ```
//!
//! Normalization runs to a fixpoint, so `normalize(normalize(r)) == normalize(r)`
//! for every accepted input.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::error::InvalidRouteError;

const ROOT: &str = "/";
const INDEX_SEGMENT: &str = "/index";

/// Canonical, immutable route key.
///
/// Cheap to clone (`Arc<str>` inside).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey(Arc<str>);

impl RouteKey {
    /// Normalizes `raw` into a route key.
    ///
    /// Fails with [`InvalidRouteError`] when `raw` does not start with `/`.
    pub fn parse(raw: &str) -> Result<Self, InvalidRouteError> {
        if !raw.starts_with('/') {
            return Err(InvalidRouteError {
                route: raw.to_string(),
            });
        }

        let mut route = raw;
        loop {
            let trimmed = route.trim_end_matches('/');
            let collapsed = trimmed.strip_suffix(INDEX_SEGMENT).unwrap_or(trimmed);
            if collapsed.len() == route.len() {
                break;
            }
            route = collapsed;
        }

        let rest = route.trim_start_matches('/');
        if rest.is_empty() {
            Ok(Self::root())
        } else if rest.len() + 1 == route.len() {
            Ok(Self(Arc::from(route)))
        } else {
            Ok(Self(Arc::from(format!("/{rest}"))))
        }
    }

    /// Returns the root key `/`.
    pub fn root() -> Self {
        Self(Arc::from(ROOT))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the root key `/`.
    #[inline]
    pub fn is_root(&self) -> bool {
        &*self.0 == ROOT
    }

    /// Path of the page script relative to the pages directory.
    ///
    /// The root page is served from `/index.js`; every other page from `{route}.js`.
    pub fn script_path(&self) -> String {
        if self.is_root() {
            format!("{INDEX_SEGMENT}.js")
        } else {
            format!("{}.js", self.0)
        }
    }
}

/// Normalizes a raw route string into a [`RouteKey`].
///
/// # Example
/// ```
/// use pageloader::normalize_route;
///
/// assert_eq!(normalize_route("/about/index").unwrap().as_str(), "/about");
/// assert_eq!(normalize_route("/index").unwrap().as_str(), "/");
/// assert!(normalize_route("about").is_err());
/// ```
pub fn normalize_route(raw: &str) -> Result<RouteKey, InvalidRouteError> {
    RouteKey::parse(raw)
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RouteKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<RouteKey> for Arc<str> {
    fn from(key: RouteKey) -> Self {
        key.0
    }
}

impl TryFrom<&str> for RouteKey {
    type Error = InvalidRouteError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        RouteKey::parse(raw)
    }
}
