//! Source orchestrator
//!
//! The Orchestrator is responsible for:
//! - Dispatching every source under a bounded worker pool
//! - Gating each source through its rate limiter
//! - Enforcing the per-run deadline via a cancellation scope
//! - Aggregating outcomes into a deduplicated, attributed host set
//!
//! ## Architecture
//!
//! ```text
//!                      ┌──────────────┐
//!   domain ──────────► │ Orchestrator │ ◄──── deadline / parent token
//!                      └──────────────┘
//!                             │ one task per source
//!         ┌───────────────────┼───────────────────┐
//!         ▼                   ▼                   ▼
//! ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  Semaphore  │ ──► │ RateLimiters │ ──► │   Source    │
//! │  (workers)  │     │  (per name)  │     │   (run)     │
//! └─────────────┘     └──────────────┘     └─────────────┘
//!                                                 │
//!                                   SourceOutcome │ mpsc
//!                                                 ▼
//!                                         ┌──────────────┐
//!                                         │  Aggregator  │
//!                                         └──────────────┘
//! ```
//!
//! ## Run Flow
//!
//! 1. Validate the domain
//! 2. Derive a cancellation scope from the caller's token
//! 3. Spawn one task per source; each waits for a worker slot, then a rate token
//! 4. Stream outcomes to the aggregator until all senders are gone or the deadline fires
//! 5. Drain every task, turning panics into failures
//! 6. Apply the return policy

use crate::domain::normalize_host;
use crate::error::{Error, Result, SourceFailure};
use crate::ratelimit::RateLimiters;
use crate::traits::SubdomainSource;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Orchestrator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Maximum number of sources running at once
    pub workers: usize,

    /// Deadline for a whole run
    pub timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Result of one dispatched source call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    /// Source name
    pub source: String,

    /// Raw hostnames reported by the source
    pub hosts: Vec<String>,

    /// Failure, when the source did not complete successfully
    pub failure: Option<SourceFailure>,
}

impl SourceOutcome {
    fn success(source: impl Into<String>, hosts: Vec<String>) -> Self {
        Self {
            source: source.into(),
            hosts,
            failure: None,
        }
    }

    fn failed(source: impl Into<String>, error: &Error) -> Self {
        let source = source.into();
        Self {
            failure: Some(SourceFailure::from_error(source.clone(), error)),
            source,
            hosts: Vec::new(),
        }
    }
}

/// A discovered hostname with its attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributedHost {
    /// Normalized hostname
    pub host: String,

    /// First source that reported the host
    pub source: String,

    /// When the host was first aggregated
    #[serde(rename = "timestamp")]
    pub discovered_at: DateTime<Utc>,

    /// Addresses attached by active verification
    #[serde(rename = "ips", skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<IpAddr>>,
}

/// Result of a successful run
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Normalized target domain
    pub domain: String,

    /// Unique hosts, sorted by hostname
    pub hosts: Vec<AttributedHost>,

    /// Sources that failed during the run
    pub failures: Vec<SourceFailure>,
}

/// First-writer-wins host aggregation
///
/// Attribution goes to whichever outcome is consumed first. Under concurrent
/// sources that order is nondeterministic; only the `source` field can differ
/// between runs.
#[derive(Default)]
struct Aggregator {
    hosts: HashMap<String, AttributedHost>,
    failures: Vec<SourceFailure>,
}

impl Aggregator {
    fn consume(&mut self, outcome: SourceOutcome) {
        if let Some(failure) = outcome.failure {
            warn!(source = %failure.source, "Source failed: {}", failure.message);
            self.failures.push(failure);
            return;
        }

        let before = self.hosts.len();
        let now = Utc::now();

        for raw in outcome.hosts {
            let host = normalize_host(&raw);
            if host.is_empty() {
                continue;
            }
            self.hosts.entry(host.clone()).or_insert_with(|| AttributedHost {
                host,
                source: outcome.source.clone(),
                discovered_at: now,
                addresses: None,
            });
        }

        debug!(
            source = %outcome.source,
            new_hosts = self.hosts.len() - before,
            "Source outcome aggregated"
        );
    }

    fn finish(self, domain: String) -> Result<Enumeration> {
        let mut hosts: Vec<AttributedHost> = self.hosts.into_values().collect();
        hosts.sort_by(|a, b| a.host.cmp(&b.host));

        if hosts.is_empty() && !self.failures.is_empty() {
            return Err(Error::AllSourcesFailed(self.failures));
        }

        Ok(Enumeration {
            domain,
            hosts,
            failures: self.failures,
        })
    }
}

/// Concurrent source orchestrator
///
/// ## Lifecycle
///
/// 1. Create with [`Orchestrator::new()`]
/// 2. Configure per-source rates with [`Orchestrator::set_rate_limit()`]
/// 3. Call [`Orchestrator::run()`] once per domain
///
/// The orchestrator holds no per-run state; runs for different domains may
/// proceed concurrently and share the rate limiters.
pub struct Orchestrator {
    sources: Vec<Arc<dyn SubdomainSource>>,
    limiters: Arc<RateLimiters>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: if `workers` is 0 or `timeout` is zero
    pub fn new(sources: Vec<Arc<dyn SubdomainSource>>, config: OrchestratorConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }
        if config.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than 0"));
        }

        Ok(Self {
            sources,
            limiters: Arc::new(RateLimiters::new()),
            config,
        })
    }

    /// Limit `source` to `requests_per_second` (0 = unlimited)
    pub fn set_rate_limit(&self, source: &str, requests_per_second: u32) {
        self.limiters.set(source, requests_per_second);
    }

    /// Names of the configured sources
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run every source against `domain`
    pub async fn run(&self, domain: &str) -> Result<Enumeration> {
        self.run_with_cancel(domain, &CancellationToken::new()).await
    }

    /// Run every source against `domain` under the caller's cancellation token
    ///
    /// # Returns
    ///
    /// - `Ok(Enumeration)`: at least one host was found, or no source failed
    /// - `Err(Error::InvalidInput)`: the domain is empty
    /// - `Err(Error::AllSourcesFailed)`: nothing was found and at least one source failed
    pub async fn run_with_cancel(
        &self,
        domain: &str,
        parent: &CancellationToken,
    ) -> Result<Enumeration> {
        let domain = normalize_host(domain);
        if domain.is_empty() {
            return Err(Error::invalid_input("domain cannot be empty"));
        }

        info!(
            domain = %domain,
            sources = self.sources.len(),
            workers = self.config.workers,
            "Starting enumeration"
        );

        let scope = parent.child_token();
        let _scope_guard = scope.clone().drop_guard();

        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let (tx, rx) = mpsc::channel(self.sources.len().max(1));
        let mut tasks = JoinSet::new();
        let mut task_sources = HashMap::new();

        for source in &self.sources {
            let name = source.name().to_string();
            let handle = tasks.spawn(dispatch(
                Arc::clone(source),
                domain.clone(),
                Arc::clone(&semaphore),
                Arc::clone(&self.limiters),
                scope.clone(),
                tx.clone(),
            ));
            task_sources.insert(handle.id(), name);
        }
        drop(tx);

        let mut aggregator = Aggregator::default();
        let mut outcomes = ReceiverStream::new(rx);
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                outcome = outcomes.next() => match outcome {
                    Some(outcome) => aggregator.consume(outcome),
                    None => break,
                },
                _ = &mut deadline, if !scope.is_cancelled() => {
                    warn!(domain = %domain, "Deadline of {:?} reached, cancelling remaining sources", self.config.timeout);
                    scope.cancel();
                }
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            if let Err(e) = joined {
                let name = task_sources
                    .get(&e.id())
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());
                error!(source = %name, "Source task aborted: {}", e);
                aggregator
                    .failures
                    .push(SourceFailure::panicked(name, e.to_string()));
            }
        }

        let result = aggregator.finish(domain);
        match &result {
            Ok(enumeration) => info!(
                domain = %enumeration.domain,
                hosts = enumeration.hosts.len(),
                failed_sources = enumeration.failures.len(),
                "Enumeration finished"
            ),
            Err(e) => error!("Enumeration failed: {}", e),
        }
        result
    }
}

/// Run one source: worker slot, rate token, then the call itself
async fn dispatch(
    source: Arc<dyn SubdomainSource>,
    domain: String,
    semaphore: Arc<Semaphore>,
    limiters: Arc<RateLimiters>,
    cancel: CancellationToken,
    tx: mpsc::Sender<SourceOutcome>,
) {
    let name = source.name().to_string();
    let outcome = run_source(source.as_ref(), &name, &domain, &semaphore, &limiters, &cancel).await;

    // The aggregator outlives every sender
    let _ = tx.send(outcome).await;
}

async fn run_source(
    source: &dyn SubdomainSource,
    name: &str,
    domain: &str,
    semaphore: &Semaphore,
    limiters: &RateLimiters,
    cancel: &CancellationToken,
) -> SourceOutcome {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return SourceOutcome::failed(name, &Error::Cancelled),
        permit = semaphore.acquire() => match permit {
            Ok(permit) => permit,
            Err(_) => return SourceOutcome::failed(name, &Error::Cancelled),
        },
    };

    if let Err(e) = limiters.acquire(name, cancel).await {
        return SourceOutcome::failed(name, &e);
    }

    debug!(source = name, domain, "Running source");

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = source.run(domain, cancel) => result,
    };

    match result {
        Ok(hosts) => {
            debug!(source = name, hosts = hosts.len(), "Source completed");
            SourceOutcome::success(name, hosts)
        }
        Err(e) => SourceOutcome::failed(name, &e),
    }
}
