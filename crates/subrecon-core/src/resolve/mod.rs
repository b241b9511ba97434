//! Resolving engine
//!
//! The [`Resolver`] wraps a [`DnsLookup`] backend with a write-once cache,
//! bounded retries with linear backoff and per-domain wildcard detection.
//!
//! ## Retry Policy
//!
//! ```text
//! attempt 0 ── retryable? ── sleep 1×backoff ── attempt 1 ── retryable? ── sleep 2×backoff ── attempt 2
//!     │                                             │                                            │
//!     └── success / permanent ──────────────────────┴────────────────────────────────────────────┴──► cache
//! ```
//!
//! Cancellation during a lookup or a backoff sleep returns [`Error::Cancelled`]
//! and leaves the cache untouched.

mod cache;
mod wildcard;

pub use cache::ResolutionCache;
pub use wildcard::WildcardVerdict;

use crate::domain::normalize_host;
use crate::engine::AttributedHost;
use crate::error::{Error, LookupFailure, Result};
use crate::traits::DnsLookup;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Resolver settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Resolver endpoints, first one preferred (empty = system configuration)
    pub endpoints: Vec<SocketAddr>,

    /// Bound on a single lookup attempt
    pub timeout: Duration,

    /// Total attempts for retryable failures
    pub attempts: usize,

    /// Linear backoff unit between attempts
    pub backoff: Duration,

    /// Default concurrency for batch resolution
    pub workers: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                SocketAddr::from(([8, 8, 8, 8], 53)),
                SocketAddr::from(([1, 1, 1, 1], 53)),
            ],
            timeout: Duration::from_secs(5),
            attempts: 3,
            backoff: Duration::from_secs(1),
            workers: 10,
        }
    }
}

/// Outcome of resolving one hostname
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// Normalized hostname
    pub hostname: String,

    /// Addresses in backend order
    pub addresses: Vec<IpAddr>,

    /// Whether the final attempt yielded at least one address
    pub exists: bool,

    /// Failure of the final attempt, if it failed
    pub failure: Option<LookupFailure>,
}

impl Resolution {
    /// A successful lookup
    pub fn resolved(hostname: impl Into<String>, addresses: Vec<IpAddr>) -> Self {
        Self {
            hostname: hostname.into(),
            exists: !addresses.is_empty(),
            addresses,
            failure: None,
        }
    }

    /// A failed lookup
    pub fn failed(hostname: impl Into<String>, failure: LookupFailure) -> Self {
        Self {
            hostname: hostname.into(),
            addresses: Vec::new(),
            exists: false,
            failure: Some(failure),
        }
    }
}

/// Cached, retrying DNS resolver with wildcard detection
///
/// One instance owns its cache and wildcard table for its whole lifetime and
/// is meant to be shared (`&Resolver` or `Arc<Resolver>`) by all callers.
pub struct Resolver {
    backend: Arc<dyn DnsLookup>,
    cache: ResolutionCache,
    wildcards: DashMap<String, Arc<OnceCell<WildcardVerdict>>>,
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver with a fresh cache
    pub fn new(backend: Arc<dyn DnsLookup>, config: ResolverConfig) -> Self {
        Self::with_cache(backend, config, ResolutionCache::new())
    }

    /// Create a resolver around an existing cache
    pub fn with_cache(
        backend: Arc<dyn DnsLookup>,
        config: ResolverConfig,
        cache: ResolutionCache,
    ) -> Self {
        debug!(
            backend = backend.backend_name(),
            attempts = config.attempts,
            "Resolver created"
        );
        Self {
            backend,
            cache,
            wildcards: DashMap::new(),
            config,
        }
    }

    /// The resolver's cache
    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    /// The resolver's settings
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a hostname, serving from cache when possible
    ///
    /// # Returns
    ///
    /// - `Ok(Resolution)`: The cached or freshly looked-up outcome; lookup
    ///   failures are recorded in `Resolution::failure`, not returned as errors
    /// - `Err(Error::Cancelled)`: `cancel` fired; nothing was cached
    pub async fn resolve(&self, hostname: &str, cancel: &CancellationToken) -> Result<Resolution> {
        let hostname = normalize_host(hostname);

        if let Some(cached) = self.cache.get(&hostname) {
            return Ok(cached);
        }

        let attempts = self.config.attempts.max(1);
        let mut attempt = 0;

        let outcome = loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = tokio::time::timeout(self.config.timeout, self.backend.lookup_host(&hostname)) => {
                    result.unwrap_or_else(|_| {
                        Err(LookupFailure::timeout(format!(
                            "no answer within {:?}",
                            self.config.timeout
                        )))
                    })
                }
            };

            match result {
                Err(failure) if failure.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.backoff * (attempt as u32 + 1);
                    debug!(
                        hostname = %hostname,
                        attempt,
                        error = %failure,
                        "Lookup failed, retrying in {:?}",
                        delay
                    );

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                other => break other,
            }
        };

        let resolution = match outcome {
            Ok(addresses) => Resolution::resolved(hostname, addresses),
            Err(failure) => Resolution::failed(hostname, failure),
        };

        self.cache.insert(resolution.clone());
        Ok(resolution)
    }

    /// Resolve many hostnames with bounded concurrency
    ///
    /// Results arrive in completion order, exactly one per input. A cancelled
    /// lookup is reported as a non-existent host with a `Cancelled` failure.
    /// `workers == 0` uses the configured default.
    pub async fn resolve_many(
        &self,
        hostnames: &[String],
        workers: usize,
        cancel: &CancellationToken,
    ) -> Vec<Resolution> {
        let workers = if workers == 0 { self.config.workers } else { workers }.max(1);

        stream::iter(hostnames)
            .map(|hostname| async move {
                match self.resolve(hostname, cancel).await {
                    Ok(resolution) => resolution,
                    Err(Error::Cancelled) => {
                        Resolution::failed(normalize_host(hostname), LookupFailure::cancelled())
                    }
                    Err(e) => {
                        Resolution::failed(normalize_host(hostname), LookupFailure::other(e.to_string()))
                    }
                }
            })
            .buffer_unordered(workers)
            .collect()
            .await
    }

    /// Actively verify discovered hosts for `domain`
    ///
    /// Keeps hosts that resolve and whose addresses do not intersect the
    /// domain's wildcard set, attaching their addresses. Wildcard detection
    /// failures are logged and treated as "no wildcard".
    pub async fn verify(
        &self,
        hosts: Vec<AttributedHost>,
        domain: &str,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<AttributedHost>> {
        let verdict = match self.detect_wildcard(domain, cancel).await {
            Ok(verdict) => Some(verdict),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(domain, "Wildcard detection failed: {}", e);
                None
            }
        };
        let verdict = verdict.as_ref();
        let workers = if workers == 0 { self.config.workers } else { workers }.max(1);

        let checked: Vec<Option<AttributedHost>> = stream::iter(hosts)
            .map(|mut host| async move {
                let resolution = self.resolve(&host.host, cancel).await.ok()?;
                if !resolution.exists {
                    return None;
                }
                if verdict.is_some_and(|v| v.matches(&resolution.addresses)) {
                    debug!(host = %host.host, "Dropping wildcard match");
                    return None;
                }
                host.addresses = Some(resolution.addresses);
                Some(host)
            })
            .buffered(workers)
            .collect()
            .await;

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        Ok(checked.into_iter().flatten().collect())
    }
}
