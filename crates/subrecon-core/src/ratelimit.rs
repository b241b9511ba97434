//! Per-source token-bucket rate limiting
//!
//! Each source with a configured rate gets a bucket of capacity 1 refilled at
//! the configured requests per second. Sources without a rate are unlimited.

use crate::error::{Error, Result};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::{num::NonZeroU32, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Rate limiters keyed by source name
#[derive(Default)]
pub struct RateLimiters {
    limiters: DashMap<String, Arc<Limiter>>,
}

impl RateLimiters {
    /// Create an empty set of limiters (every source unlimited)
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the rate for `source` in requests per second
    ///
    /// A rate of 0 removes any limit. Reconfiguring replaces the bucket.
    pub fn set(&self, source: &str, requests_per_second: u32) {
        match NonZeroU32::new(requests_per_second) {
            Some(rate) => {
                let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
                self.limiters
                    .insert(source.to_string(), Arc::new(RateLimiter::direct(quota)));
                debug!(source, rate = requests_per_second, "Rate limit configured");
            }
            None => {
                self.limiters.remove(source);
                debug!(source, "Rate limit removed");
            }
        }
    }

    /// Whether `source` has a configured rate
    pub fn is_limited(&self, source: &str) -> bool {
        self.limiters.contains_key(source)
    }

    /// Wait for a token for `source`
    ///
    /// # Returns
    ///
    /// - `Ok(())`: A token was granted (immediately for unlimited sources)
    /// - `Err(Error::RateLimitAborted)`: `cancel` fired before a token was available
    pub async fn acquire(&self, source: &str, cancel: &CancellationToken) -> Result<()> {
        // Clone out of the map so no shard lock is held across the await
        let limiter = match self.limiters.get(source) {
            Some(entry) => Arc::clone(entry.value()),
            None => return Ok(()),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::RateLimitAborted(source.to_string())),
            _ = limiter.until_ready() => Ok(()),
        }
    }
}
