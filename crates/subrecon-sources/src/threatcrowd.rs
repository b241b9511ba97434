//! ThreatCrowd domain report source

use crate::collect_hosts;
use crate::http::HttpFetcher;
use async_trait::async_trait;
use serde::Deserialize;
use subrecon_core::config::SourceConfig;
use subrecon_core::traits::{SourceFactory, SubdomainSource};
use subrecon_core::Result;
use tokio_util::sync::CancellationToken;

const THREATCROWD_URL: &str = "https://www.threatcrowd.org/searchApi/v2/domain/report/";

#[derive(Debug, Deserialize)]
struct DomainReport {
    #[serde(default)]
    response_code: String,
    #[serde(default)]
    subdomains: Vec<String>,
}

/// Queries the ThreatCrowd domain report
#[derive(Debug)]
pub struct ThreatCrowd {
    fetcher: HttpFetcher,
    max_results: usize,
}

impl ThreatCrowd {
    /// Create the source from its configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new("threatcrowd", config)?,
            max_results: config.max_results,
        })
    }
}

/// A `response_code` other than "1" means no data, not a failure
fn parse(body: &str, domain: &str, max_results: usize) -> Result<Vec<String>> {
    let report: DomainReport = serde_json::from_str(body)?;
    if report.response_code != "1" {
        return Ok(Vec::new());
    }

    Ok(collect_hosts(
        report.subdomains.iter().map(String::as_str),
        domain,
        max_results,
    ))
}

#[async_trait]
impl SubdomainSource for ThreatCrowd {
    async fn run(&self, domain: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let request = self.fetcher.get(THREATCROWD_URL).query(&[("domain", domain)]);

        let body = self.fetcher.fetch(request, cancel).await?;
        parse(&body, domain, self.max_results)
    }

    fn name(&self) -> &str {
        "threatcrowd"
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// Factory for [`ThreatCrowd`]
pub struct ThreatCrowdFactory;

impl SourceFactory for ThreatCrowdFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SubdomainSource>> {
        Ok(Box::new(ThreatCrowd::new(config)?))
    }
}
