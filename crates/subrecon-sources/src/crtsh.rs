//! crt.sh certificate transparency source

use crate::collect_hosts;
use crate::http::HttpFetcher;
use async_trait::async_trait;
use serde::Deserialize;
use subrecon_core::config::SourceConfig;
use subrecon_core::traits::{SourceFactory, SubdomainSource};
use subrecon_core::Result;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const CRTSH_URL: &str = "https://crt.sh/";

#[derive(Debug, Deserialize)]
struct Certificate {
    #[serde(default)]
    name_value: String,
}

/// Queries crt.sh for certificates issued under the domain
#[derive(Debug)]
pub struct CrtSh {
    fetcher: HttpFetcher,
    max_results: usize,
}

impl CrtSh {
    /// Create the source from its configuration
    pub fn new(config: &SourceConfig) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::new("crtsh", config)?,
            max_results: config.max_results,
        })
    }
}

/// `name_value` holds one or more names separated by newlines
fn parse(body: &str, domain: &str, max_results: usize) -> Result<Vec<String>> {
    let certificates: Vec<Certificate> = serde_json::from_str(body)?;

    Ok(collect_hosts(
        certificates.iter().flat_map(|c| c.name_value.lines()),
        domain,
        max_results,
    ))
}

#[async_trait]
impl SubdomainSource for CrtSh {
    async fn run(&self, domain: &str, cancel: &CancellationToken) -> Result<Vec<String>> {
        let query = format!("%.{}", domain);
        let request = self
            .fetcher
            .get(CRTSH_URL)
            .query(&[("q", query.as_str()), ("output", "json")]);

        let body = self.fetcher.fetch(request, cancel).await?;
        let hosts = parse(&body, domain, self.max_results)?;

        debug!(source = "crtsh", domain, hosts = hosts.len(), "Parsed certificates");
        Ok(hosts)
    }

    fn name(&self) -> &str {
        "crtsh"
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// Factory for [`CrtSh`]
pub struct CrtShFactory;

impl SourceFactory for CrtShFactory {
    fn create(&self, config: &SourceConfig) -> Result<Box<dyn SubdomainSource>> {
        Ok(Box::new(CrtSh::new(config)?))
    }
}
