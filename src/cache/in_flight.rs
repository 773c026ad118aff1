//! # Routes with a dispatched fetch.
//!
//! Checked before dispatching so that a route is fetched at most once per cache
//! lifetime. Entries are never removed.

use std::collections::HashSet;

use parking_lot::Mutex;

use crate::route::RouteKey;

/// Set of routes whose fetch has already been dispatched.
#[derive(Default)]
pub struct LoadingRoutes {
    routes: Mutex<HashSet<RouteKey>>,
}

impl LoadingRoutes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `route` for dispatch.
    ///
    /// Returns `true` if the caller is the first to claim it and must dispatch.
    pub fn claim(&self, route: &RouteKey) -> bool {
        self.routes.lock().insert(route.clone())
    }

    /// True if a fetch was already dispatched for `route`.
    pub fn contains(&self, route: &RouteKey) -> bool {
        self.routes.lock().contains(route)
    }

    /// Number of routes claimed so far.
    pub fn len(&self) -> usize {
        self.routes.lock().len()
    }

    /// True if nothing was claimed yet.
    pub fn is_empty(&self) -> bool {
        self.routes.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_first_wins() {
        let set = LoadingRoutes::new();
        let route = RouteKey::parse("/blog").unwrap();
        assert!(set.claim(&route));
        assert!(!set.claim(&route));
        assert!(set.contains(&route));
        assert_eq!(set.len(), 1);
    }
}
