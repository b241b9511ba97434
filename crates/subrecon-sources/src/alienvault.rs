//! AlienVault OTX passive DNS source

use crate::http::HttpFetcher;
use crate::{collect_hosts, require_key};
use async_trait::async_trait;
use serde::Deserialize;
use subrecon_core::config::SourceConfig;
use subrecon_core::traits::{SourceFactory, SubdomainSource};
use subrecon_core::Result;
use tokio_util::sync::CancellationToken;

const OTX_API_BASE: &str = "https://otx.alienvault.com/api/v1/indicators/domain";

#[derive(Debug, Deserialize)]
struct PassiveDnsResponse {
    #[serde(default)]
    passive_dns: Vec<PassiveDnsRecord>,
}

#[derive(Debug, Deserialize)]
struct PassiveDnsRecord {
    #[serde(default)]
    hostname: String,
}

/// Queries OTX passive DNS (key required, sent as `X-OTX-API-KEY`)
pub struct AlienVault {
    fetcher: HttpFetcher,
    /// ⚠️ NEVER log this value
    api_key: Option<String>,
    max_results: usize,
}

// Hides the API key
impl std::fmt::Debug for AlienVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlienVault")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl AlienVault {
    /// Create the source from its configuration
    ///
    /// A missing key is not an error here; `run` reports it.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new("alienvault", config)?,
            api_key: config.api_key().map(str::to_string),
            max_results: config.max_results,
        })
    }
}

fn parse(body: &str, domain: &str, max_results: usize) -> Result<Vec<String>> {
    let response: PassiveDnsResponse = serde_json::from_str(body)?;

    Ok(collect_hosts(
        response.passive_dns.iter().map(|r| r.hostname.as_str()),
        domain,
        max_results,
    ))
}

#[async_trait]
impl SubdomainSource for AlienVault {
    async fn run(&self, domain: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let key = require_key("alienvault", self.api_key.as_deref())?;

        let url = format!("{}/{}/passive_dns", OTX_API_BASE, domain);
        let request = self.fetcher.get(&url).header("X-OTX-API-KEY", key);

        let body = self.fetcher.fetch(request, cancel).await?;
        parse(&body, domain, self.max_results)
    }

    fn name(&self) -> &str {
        "alienvault"
    }

    fn needs_key(&self) -> bool {
        true
    }
}

/// Factory for [`AlienVault`]
pub struct AlienVaultFactory;

impl SourceFactory for AlienVaultFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SubdomainSource>> {
        Ok(Box::new(AlienVault::new(config)?))
    }
}
