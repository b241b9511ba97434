// # Subdomain Source Trait
//
// Defines the interface for passive data sources that, given a domain,
// return candidate hostnames.
//
// ## Implementations
//
// - crt.sh, HackerTarget, AlienVault OTX, urlscan.io, ThreatCrowd:
//   `subrecon-sources` crate
//
// ## Usage
//
// ```rust,ignore
// use subrecon_core::SubdomainSource;
// use tokio_util::sync::CancellationToken;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* SubdomainSource implementation */;
//     let cancel = CancellationToken::new();
//
//     let hosts = source.run("example.com", &cancel).await?;
//     println!("{} reported {} hosts", source.name(), hosts.len());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trait for subdomain source implementations
///
/// # Thread Safety
///
/// Implementations must be thread-safe: the orchestrator shares each source
/// with its dispatch task through an `Arc`.
///
/// # Cancellation
///
/// Sources must observe `cancel` at every await point and return promptly once
/// it fires. The orchestrator stops awaiting a source as soon as the run is
/// cancelled, so a source that ignores the token only wastes its own work.
///
/// # Normalization
///
/// Returned hostnames are plain strings. Case and whitespace normalization
/// belong to the orchestrator, not to the source.
#[async_trait]
pub trait SubdomainSource: Send + Sync {
    /// Query the source for hostnames under `domain`
    ///
    /// # Parameters
    ///
    /// - `domain`: The target domain (e.g., "example.com")
    /// - `cancel`: Cancellation scope of the current run
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: Raw hostnames reported by the source
    /// - `Err(Error)`: If the source failed; the orchestrator records it and moves on
    async fn run(
        &self,
        domain: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, crate::Error>;

    /// Get the source name (used for attribution, rate limits and logging)
    fn name(&self) -> &str;

    /// Whether this source needs an API key to produce results
    fn needs_key(&self) -> bool;
}

/// Helper trait for constructing sources from configuration
pub trait SourceFactory: Send + Sync {
    /// Create a SubdomainSource instance from its per-source configuration
    fn create(
        &self,
        config: &crate::config::SourceConfig,
    ) -> Result<Box<dyn SubdomainSource>, crate::Error>;
}
