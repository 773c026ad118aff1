//! # Hot-reload coordinator status.
//!
//! In development mode the embedder publishes the coordinator status on a
//! [`tokio::sync::watch`] channel. A registration arriving while the status is not
//! [`HotStatus::Idle`] is held back until the status returns to idle.

use std::fmt;

/// Status of the hot-reload coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HotStatus {
    /// No update in progress.
    #[default]
    Idle,
    /// Checking for an update.
    Check,
    /// Preparing an update.
    Prepare,
    /// Update downloaded and ready to apply.
    Ready,
    /// Disposing outdated modules.
    Dispose,
    /// Applying the update.
    Apply,
    /// Update aborted.
    Abort,
    /// Update failed.
    Fail,
}

impl HotStatus {
    /// Returns a short stable label for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HotStatus::Idle => "idle",
            HotStatus::Check => "check",
            HotStatus::Prepare => "prepare",
            HotStatus::Ready => "ready",
            HotStatus::Dispose => "dispose",
            HotStatus::Apply => "apply",
            HotStatus::Abort => "abort",
            HotStatus::Fail => "fail",
        }
    }

    /// True when registrations may complete immediately.
    pub fn is_idle(&self) -> bool {
        *self == HotStatus::Idle
    }
}

impl fmt::Display for HotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}
