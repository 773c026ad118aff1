//! Route keys and script addressing.
//!
//! ## Contents
//! - [`RouteKey`], [`normalize_route`] canonical cache/dedup key for a page
//! - [`ScriptUrls`] page and dependency script URLs for one build
//! - [`encode_uri`], [`encode_component`] browser-compatible percent encoding

mod key;
mod url;

pub use key::{RouteKey, normalize_route};
pub use url::{ScriptUrls, encode_component, encode_uri, to_module_url};
