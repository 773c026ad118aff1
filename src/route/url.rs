//! # Script URL construction.
//!
//! Page scripts are addressed as:
//! ```text
//! {asset_prefix}/_next/static/{encodeURIComponent(build_id)}/pages{script_path}
//! ```
//! where `script_path` is `/index.js` for the root and `{route}.js` otherwise.
//! Module builds swap the `.js` suffix for `.module.js` on page scripts only;
//! dependency URLs from the manifest already carry their final name.
//!
//! Encoding mirrors the browser primitives the URLs end up in:
//! [`encode_component`] matches `encodeURIComponent`, [`encode_uri`] matches `encodeURI`.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::RouteKey;

/// Characters left untouched by `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters left untouched by `encodeURI` (component set plus reserved delimiters).
const URI: &AsciiSet = &COMPONENT
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'#');

const JS_SUFFIX: &str = ".js";
const MODULE_SUFFIX: &str = ".module.js";

/// Percent-encodes a single URL component.
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Percent-encodes a full URL, keeping reserved delimiters.
pub fn encode_uri(input: &str) -> String {
    utf8_percent_encode(input, URI).to_string()
}

/// Rewrites a trailing `.js` into `.module.js`; other URLs are returned unchanged.
pub fn to_module_url(url: &str) -> String {
    match url.strip_suffix(JS_SUFFIX) {
        Some(stem) => format!("{stem}{MODULE_SUFFIX}"),
        None => url.to_string(),
    }
}

/// Builds script URLs for one build of the application.
#[derive(Clone, Debug)]
pub struct ScriptUrls {
    asset_prefix: String,
    build_id: String,
}

impl ScriptUrls {
    /// Creates a URL builder for the given asset prefix and build id.
    pub fn new(asset_prefix: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            asset_prefix: asset_prefix.into(),
            build_id: build_id.into(),
        }
    }

    /// URL of the page script for `route`.
    ///
    /// `module` selects the `.module.js` variant.
    pub fn page(&self, route: &RouteKey, module: bool) -> String {
        let script_path = route.script_path();
        let script_path = if module {
            to_module_url(&script_path)
        } else {
            script_path
        };
        format!(
            "{}/_next/static/{}/pages{}",
            self.asset_prefix,
            encode_component(&self.build_id),
            script_path
        )
    }

    /// URL of a dependency listed in the build manifest.
    pub fn dependency(&self, manifest_entry: &str) -> String {
        format!("/_next/{manifest_entry}")
    }

    /// URL used when prefetching a dependency that is already a full path.
    pub fn prefixed(&self, path: &str) -> String {
        format!("{}{}", self.asset_prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(raw: &str) -> RouteKey {
        RouteKey::parse(raw).unwrap()
    }

    #[test]
    fn test_page_url_for_root_and_nested() {
        let urls = ScriptUrls::new("", "build-1");
        assert_eq!(
            urls.page(&RouteKey::root(), false),
            "/_next/static/build-1/pages/index.js"
        );
        assert_eq!(
            urls.page(&route("/blog/post-1"), false),
            "/_next/static/build-1/pages/blog/post-1.js"
        );
    }

    #[test]
    fn test_page_url_encodes_build_id_and_applies_prefix() {
        let urls = ScriptUrls::new("https://cdn.example.com", "a b/c");
        assert_eq!(
            urls.page(&route("/about"), false),
            "https://cdn.example.com/_next/static/a%20b%2Fc/pages/about.js"
        );
    }

    #[test]
    fn test_module_variant_only_touches_suffix() {
        let urls = ScriptUrls::new("", "b");
        assert_eq!(
            urls.page(&route("/about"), true),
            "/_next/static/b/pages/about.module.js"
        );
        assert_eq!(to_module_url("/x/chunk.css"), "/x/chunk.css");
    }

    #[test]
    fn test_dependency_url() {
        let urls = ScriptUrls::new("/prefix", "b");
        assert_eq!(
            urls.dependency("static/chunks/chunk-a.js"),
            "/_next/static/chunks/chunk-a.js"
        );
        assert_eq!(urls.prefixed("/_next/x.js"), "/prefix/_next/x.js");
    }

    #[test]
    fn test_encode_uri_keeps_delimiters() {
        assert_eq!(
            encode_uri("/_next/static/b/pages/blog post.js?v=1"),
            "/_next/static/b/pages/blog%20post.js?v=1"
        );
        assert_eq!(encode_component("a/b?c"), "a%2Fb%3Fc");
    }
}
