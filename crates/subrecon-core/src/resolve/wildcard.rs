//! Wildcard DNS detection
//!
//! A domain is probed with three random labels that should not exist. When at
//! least two probes resolve and share an address, that address set is the
//! domain's wildcard signature and any host resolving into it is discarded.

use super::Resolver;
use crate::domain::normalize_host;
use crate::error::Result;
use futures::future::try_join_all;
use futures::stream::{self, StreamExt};
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::net::IpAddr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const PROBE_COUNT: usize = 3;
const PROBE_LABEL_LEN: usize = 16;
const PROBE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Result of wildcard detection for one domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WildcardVerdict {
    /// Normalized domain
    pub domain: String,

    /// Addresses shared by at least two probes (empty = no wildcard)
    pub addresses: BTreeSet<IpAddr>,
}

impl WildcardVerdict {
    /// Whether the domain answers for arbitrary labels
    pub fn is_wildcard(&self) -> bool {
        !self.addresses.is_empty()
    }

    /// Whether any of `addresses` belongs to the wildcard set
    pub fn matches(&self, addresses: &[IpAddr]) -> bool {
        addresses.iter().any(|ip| self.addresses.contains(ip))
    }
}

impl Resolver {
    /// Detect wildcard DNS for `domain`
    ///
    /// Probes run at most once per domain per resolver, even under concurrent
    /// callers. Both positive and negative verdicts are memoized; a cancelled
    /// detection is not, and the next caller probes again.
    pub async fn detect_wildcard(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<WildcardVerdict> {
        let domain = normalize_host(domain);
        let cell = self.wildcards.entry(domain.clone()).or_default().clone();

        let verdict = cell
            .get_or_try_init(|| self.probe_wildcard(&domain, cancel))
            .await?;

        Ok(verdict.clone())
    }

    async fn probe_wildcard(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<WildcardVerdict> {
        let probes: Vec<String> = (0..PROBE_COUNT)
            .map(|_| format!("{}.{}", random_label(PROBE_LABEL_LEN), domain))
            .collect();

        let resolutions =
            try_join_all(probes.iter().map(|probe| self.resolve(probe, cancel))).await?;

        let answering: Vec<Vec<IpAddr>> = resolutions
            .into_iter()
            .filter(|resolution| resolution.exists)
            .map(|resolution| resolution.addresses)
            .collect();

        let addresses = if answering.len() >= 2 {
            shared_addresses(&answering)
        } else {
            BTreeSet::new()
        };

        if addresses.is_empty() {
            debug!(domain, probes_answered = answering.len(), "No wildcard detected");
        } else {
            info!(domain, ?addresses, "Wildcard DNS detected");
        }

        Ok(WildcardVerdict {
            domain: domain.to_string(),
            addresses,
        })
    }

    /// Whether `hostname` resolves into the wildcard set of `domain`
    ///
    /// Hosts that do not resolve never match.
    pub async fn is_wildcard_match(
        &self,
        hostname: &str,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let verdict = self.detect_wildcard(domain, cancel).await?;
        if !verdict.is_wildcard() {
            return Ok(false);
        }

        let resolution = self.resolve(hostname, cancel).await?;
        Ok(resolution.exists && verdict.matches(&resolution.addresses))
    }

    /// Drop hostnames that resolve into the wildcard set of `domain`
    ///
    /// Input order is preserved. If detection fails the input is returned
    /// unchanged, and a host whose lookup is cancelled is kept.
    pub async fn filter_wildcards(
        &self,
        hostnames: Vec<String>,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let verdict = match self.detect_wildcard(domain, cancel).await {
            Ok(verdict) if verdict.is_wildcard() => verdict,
            Ok(_) => return hostnames,
            Err(e) => {
                warn!(domain, "Wildcard detection failed, keeping all hosts: {}", e);
                return hostnames;
            }
        };
        let verdict = &verdict;
        let before = hostnames.len();

        let kept: Vec<Option<String>> = stream::iter(hostnames)
            .map(|hostname| async move {
                let matched = match self.resolve(&hostname, cancel).await {
                    Ok(resolution) => resolution.exists && verdict.matches(&resolution.addresses),
                    Err(_) => false,
                };
                (!matched).then_some(hostname)
            })
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let kept: Vec<String> = kept.into_iter().flatten().collect();
        debug!(domain, removed = before - kept.len(), "Wildcard filter applied");
        kept
    }
}

/// Addresses present in at least two of the given lists, each list deduplicated first
fn shared_addresses(lists: &[Vec<IpAddr>]) -> BTreeSet<IpAddr> {
    let mut counts: HashMap<IpAddr, usize> = HashMap::new();

    for list in lists {
        let unique: HashSet<&IpAddr> = list.iter().collect();
        for ip in unique {
            *counts.entry(*ip).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .map(|(ip, _)| ip)
        .collect()
}

/// Random label over `[a-z0-9]`
fn random_label(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| PROBE_CHARSET[rng.random_range(0..PROBE_CHARSET.len())] as char)
        .collect()
}
