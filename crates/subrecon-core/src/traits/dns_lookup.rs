// # DNS Lookup Trait
//
// Defines the single-shot hostname-to-address lookup the resolver builds on.
//
// ## Implementations
//
// - hickory-resolver: `subrecon-dns-hickory` crate
//
// Backends perform exactly one lookup per call. Caching, retries, backoff,
// per-lookup timeouts and cancellation are owned by `Resolver`.

use crate::error::LookupFailure;
use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for DNS lookup backends
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Resolve `hostname` to its addresses
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<IpAddr>)`: Addresses in the order the backend reported them
    /// - `Err(LookupFailure)`: Classified failure; `is_retryable()` decides
    ///   whether the resolver tries again
    async fn lookup_host(&self, hostname: &str) -> Result<Vec<IpAddr>, LookupFailure>;

    /// Get the backend name (for logging/debugging)
    fn backend_name(&self) -> &'static str;
}
