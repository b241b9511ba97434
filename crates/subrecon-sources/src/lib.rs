// # Passive HTTP Sources
//
// This crate provides the passive data sources SubRecon queries for hostnames.
//
// ## Sources
//
// | name           | API key  | data                               |
// |----------------|----------|------------------------------------|
// | `crtsh`        | no       | certificate transparency logs      |
// | `hackertarget` | optional | host search CSV                    |
// | `alienvault`   | required | OTX passive DNS                    |
// | `urlscan`      | optional | urlscan.io search results          |
// | `threatcrowd`  | no       | ThreatCrowd domain report          |
//
// ## Behavior
//
// - One source call may issue several HTTP attempts (see `HttpFetcher`)
// - Every await observes the run's cancellation token
// - Results are lower-cased, trimmed, restricted to the target domain and
//   deduplicated before they reach the orchestrator
//
// ## Security Requirements
//
// - API keys NEVER appear in logs or `Debug` output

mod alienvault;
mod crtsh;
mod hackertarget;
pub mod http;
mod threatcrowd;
mod urlscan;

pub use alienvault::{AlienVault, AlienVaultFactory};
pub use crtsh::{CrtSh, CrtShFactory};
pub use hackertarget::{HackerTarget, HackerTargetFactory};
pub use threatcrowd::{ThreatCrowd, ThreatCrowdFactory};
pub use urlscan::{UrlScan, UrlScanFactory};

use std::collections::BTreeSet;
use subrecon_core::domain::{belongs_to, normalize_host};
use subrecon_core::registry::SourceRegistry;

/// Names of every source in this crate, in default query order
pub const SOURCE_NAMES: [&str; 5] = ["crtsh", "hackertarget", "alienvault", "urlscan", "threatcrowd"];

/// Register every source factory with `registry`
pub fn register(registry: &SourceRegistry) {
    registry.register_source("crtsh", Box::new(CrtShFactory));
    registry.register_source("hackertarget", Box::new(HackerTargetFactory));
    registry.register_source("alienvault", Box::new(AlienVaultFactory));
    registry.register_source("urlscan", Box::new(UrlScanFactory));
    registry.register_source("threatcrowd", Box::new(ThreatCrowdFactory));
}

/// Normalize raw names, keep those under `domain` and deduplicate
///
/// A leading `*.` is stripped. At most `max_results` names are returned
/// (0 = unlimited).
pub(crate) fn collect_hosts<'a>(
    names: impl IntoIterator<Item = &'a str>,
    domain: &str,
    max_results: usize,
) -> Vec<String> {
    let domain = normalize_host(domain);

    let unique: BTreeSet<String> = names
        .into_iter()
        .map(normalize_host)
        .map(|name| match name.strip_prefix("*.") {
            Some(stripped) => stripped.to_string(),
            None => name,
        })
        .filter(|name| !name.is_empty() && belongs_to(name, &domain))
        .collect();

    let limit = if max_results == 0 { usize::MAX } else { max_results };
    unique.into_iter().take(limit).collect()
}

/// Reject calls for sources that cannot run without a key
pub(crate) fn require_key<'a>(source: &str, key: Option<&'a str>) -> subrecon_core::Result<&'a str> {
    key.ok_or_else(|| subrecon_core::Error::source_error(source, "an API key is required"))
}
