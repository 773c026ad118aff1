//! # Logging subscriber.
//!
//! [`LogWriter`] renders lifecycle events as one-line `tracing` records.
//!
//! ## Output format
//! ```text
//! [requested] route=/blog
//! [dependency] route=/blog url=/_next/chunk-a.js
//! [fetch] route=/blog url=/_next/static/b/pages/blog.js
//! [registered] route=/blog
//! [fetch-failed] route=/down url=/_next/static/b/pages/down.js reason="network error"
//! [prefetch-skipped] route=/about reason="constrained_network"
//! ```

use async_trait::async_trait;

use crate::events::Event;
use crate::subscribers::Subscribe;

/// Subscriber that logs every event at `info` level.
///
/// Enabled via the `logging` feature.
pub struct LogWriter;

impl LogWriter {
    fn render(e: &Event) -> String {
        let mut line = format!("[{}]", e.kind.as_label());
        if let Some(route) = &e.route {
            line.push_str(&format!(" route={route}"));
        }
        if let Some(url) = &e.url {
            line.push_str(&format!(" url={url}"));
        }
        if let Some(reason) = &e.reason {
            line.push_str(&format!(" reason={reason:?}"));
        }
        line
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        tracing::info!(seq = e.seq, "{}", Self::render(e));
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
