//! Resolution cache
//!
//! Write-once per hostname for the lifetime of the owning resolver. There is
//! no invalidation; a recorded failure is served back just like a success.

use super::Resolution;
use dashmap::DashMap;
use std::sync::Arc;

/// Concurrent hostname → [`Resolution`] map
///
/// Cloning yields a handle to the same underlying map, so a cache can be
/// shared between resolvers or inspected by tests.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    entries: Arc<DashMap<String, Resolution>>,
}

impl ResolutionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached resolution for `hostname`, if any
    pub fn get(&self, hostname: &str) -> Option<Resolution> {
        self.entries.get(hostname).map(|entry| entry.value().clone())
    }

    /// Store a resolution, overwriting a concurrent writer's entry
    pub fn insert(&self, resolution: Resolution) {
        self.entries.insert(resolution.hostname.clone(), resolution);
    }

    /// Whether `hostname` has been resolved
    pub fn contains(&self, hostname: &str) -> bool {
        self.entries.contains_key(hostname)
    }

    /// Number of cached hostnames
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
