//! HackerTarget host search source

use crate::collect_hosts;
use crate::http::HttpFetcher;
use async_trait::async_trait;
use subrecon_core::config::SourceConfig;
use subrecon_core::traits::{SourceFactory, SubdomainSource};
use subrecon_core::{Error, Result};
use tokio_util::sync::CancellationToken;

const HACKERTARGET_URL: &str = "https://api.hackertarget.com/hostsearch/";

/// Queries the HackerTarget host search API (key optional)
pub struct HackerTarget {
    fetcher: HttpFetcher,
    api_key: Option<String>,
    max_results: usize,
}

// Hides the API key
impl std::fmt::Debug for HackerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HackerTarget")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl HackerTarget {
    /// Create the source from its configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new("hackertarget", config)?,
            api_key: config.api_key().map(str::to_string),
            max_results: config.max_results,
        })
    }
}

/// Body is `host,ip` lines, or a plain-text error message
///
/// Only a body that is not CSV is an error; hostnames such as
/// `error.example.com` are data.
fn parse(body: &str, domain: &str, max_results: usize) -> Result<Vec<String>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let is_csv = trimmed.lines().any(|line| line.contains(','));
    if !is_csv || trimmed.starts_with("error") || trimmed.starts_with("API count exceeded") {
        return Err(Error::source_error(
            "hackertarget",
            format!("API error: {}", trimmed),
        ));
    }

    Ok(collect_hosts(
        body.lines()
            .filter_map(|line| line.split(',').next())
            .filter(|host| !host.trim().is_empty()),
        domain,
        max_results,
    ))
}

#[async_trait]
impl SubdomainSource for HackerTarget {
    async fn run(&self, domain: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let mut request = self.fetcher.get(HACKERTARGET_URL).query(&[("q", domain)]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("apikey", key.as_str())]);
        }

        let body = self.fetcher.fetch(request, cancel).await?;
        parse(&body, domain, self.max_results)
    }

    fn name(&self) -> &str {
        "hackertarget"
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// Factory for [`HackerTarget`]
pub struct HackerTargetFactory;

impl SourceFactory for HackerTargetFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SubdomainSource>> {
        Ok(Box::new(HackerTarget::new(config)?))
    }
}
