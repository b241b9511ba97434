//! urlscan.io search source

use crate::collect_hosts;
use crate::http::HttpFetcher;
use async_trait::async_trait;
use serde::Deserialize;
use subrecon_core::config::SourceConfig;
use subrecon_core::traits::{SourceFactory, SubdomainSource};
use subrecon_core::Result;
use tokio_util::sync::CancellationToken;

const URLSCAN_URL: &str = "https://urlscan.io/api/v1/search/";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    page: Page,
}

#[derive(Debug, Default, Deserialize)]
struct Page {
    #[serde(default)]
    domain: String,
}

/// Queries urlscan.io search results (key optional, sent as `API-Key`)
pub struct UrlScan {
    fetcher: HttpFetcher,
    api_key: Option<String>,
    max_results: usize,
}

// Hides the API key
impl std::fmt::Debug for UrlScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlScan")
            .field("api_key", &self.api_key.as_ref().map(|_| "<REDACTED>"))
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl UrlScan {
    /// Create the source from its configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new("urlscan", config)?,
            api_key: config.api_key().map(str::to_string),
            max_results: config.max_results,
        })
    }
}

fn parse(body: &str, domain: &str, max_results: usize) -> Result<Vec<String>> {
    let response: SearchResponse = serde_json::from_str(body)?;

    Ok(collect_hosts(
        response.results.iter().map(|r| r.page.domain.as_str()),
        domain,
        max_results,
    ))
}

#[async_trait]
impl SubdomainSource for UrlScan {
    async fn run(&self, domain: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let query = format!("domain:{}", domain);
        let mut request = self.fetcher.get(URLSCAN_URL).query(&[("q", query.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.header("API-Key", key.as_str());
        }

        let body = self.fetcher.fetch(request, cancel).await?;
        parse(&body, domain, self.max_results)
    }

    fn name(&self) -> &str {
        "urlscan"
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// Factory for [`UrlScan`]
pub struct UrlScanFactory;

impl SourceFactory for UrlScanFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SubdomainSource>> {
        Ok(Box::new(UrlScan::new(config)?))
    }
}
