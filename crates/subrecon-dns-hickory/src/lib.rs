// # hickory-resolver DNS Backend
//
// This crate provides the `DnsLookup` implementation SubRecon verifies hosts with.
//
// ## Behavior
//
// - Configured endpoints are queried in the order given (UDP, then TCP for
//   truncated answers); with no endpoints the system configuration is used
// - One attempt per call: retries, backoff and caching belong to the core
//   `Resolver`
// - A and AAAA records are both requested
//
// ## Error Classification
//
// | hickory error                         | failure     | retried |
// |---------------------------------------|-------------|---------|
// | no records / NXDOMAIN                 | `NotFound`  | no      |
// | timeout                               | `Timeout`   | yes     |
// | I/O, busy, no connections             | `Temporary` | yes     |
// | anything else                         | `Other`     | no      |

use async_trait::async_trait;
use hickory_resolver::config::{
    LookupIpStrategy, NameServerConfig, ResolverConfig as HickoryConfig, ResolverOpts,
    ServerOrderingStrategy,
};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::ProtoErrorKind;
use hickory_resolver::proto::xfer::Protocol;
use hickory_resolver::{ResolveError, ResolveErrorKind, TokioResolver};
use std::net::IpAddr;
use subrecon_core::error::LookupFailure;
use subrecon_core::resolve::ResolverConfig;
use subrecon_core::traits::DnsLookup;
use subrecon_core::{Error, Result};
use tracing::{debug, trace};

/// DNS lookups through hickory's async resolver
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    /// Build a resolver for the configured endpoints
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: no endpoints were given and the system
    ///   configuration could not be read
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.timeout = config.timeout;
        opts.attempts = 1;
        opts.ip_strategy = LookupIpStrategy::Ipv4AndIpv6;
        opts.server_ordering_strategy = ServerOrderingStrategy::UserProvidedOrder;

        let builder = if config.endpoints.is_empty() {
            TokioResolver::builder(TokioConnectionProvider::default()).map_err(|e| {
                Error::config(format!("failed to read system DNS configuration: {}", e))
            })?
        } else {
            let mut hickory_config = HickoryConfig::new();
            for endpoint in &config.endpoints {
                hickory_config.add_name_server(NameServerConfig::new(*endpoint, Protocol::Udp));
                hickory_config.add_name_server(NameServerConfig::new(*endpoint, Protocol::Tcp));
            }
            TokioResolver::builder_with_config(hickory_config, TokioConnectionProvider::default())
        };

        debug!(endpoints = ?config.endpoints, timeout = ?config.timeout, "hickory resolver configured");

        Ok(Self {
            resolver: builder.with_options(opts).build(),
        })
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup_host(&self, hostname: &str) -> std::result::Result<Vec<IpAddr>, LookupFailure> {
        // Fully qualified so search domains are never appended
        let fqdn = format!("{}.", hostname.trim_end_matches('.'));

        match self.resolver.lookup_ip(fqdn.as_str()).await {
            Ok(lookup) => {
                let addresses: Vec<IpAddr> = lookup.iter().collect();
                trace!(hostname, count = addresses.len(), "lookup answered");
                Ok(addresses)
            }
            Err(e) => Err(classify(&e)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "hickory"
    }
}

fn classify(error: &ResolveError) -> LookupFailure {
    let message = error.to_string();

    if error.is_no_records_found() {
        return LookupFailure::not_found(message);
    }

    match error.kind() {
        ResolveErrorKind::Proto(proto) => match proto.kind() {
            ProtoErrorKind::Timeout => LookupFailure::timeout(message),
            ProtoErrorKind::Io(_) | ProtoErrorKind::Busy | ProtoErrorKind::NoConnections => {
                LookupFailure::temporary(message)
            }
            _ => LookupFailure::other(message),
        },
        _ => LookupFailure::other(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use subrecon_core::error::LookupFailureKind;

    #[test]
    fn builds_with_explicit_endpoints() {
        let config = ResolverConfig {
            endpoints: vec!["127.0.0.1:5353".parse().unwrap()],
            timeout: Duration::from_secs(1),
            ..ResolverConfig::default()
        };

        let lookup = HickoryLookup::new(&config).unwrap();
        assert_eq!(lookup.backend_name(), "hickory");
    }

    #[test]
    fn static_messages_are_permanent_failures() {
        let error = ResolveError::from("resolver misconfigured");

        let failure = classify(&error);
        assert_eq!(failure.kind, LookupFailureKind::Other);
        assert!(!failure.is_retryable());
    }

    #[tokio::test]
    #[ignore] // requires network access
    async fn nonexistent_name_is_not_found() {
        let lookup = HickoryLookup::new(&ResolverConfig::default()).unwrap();

        let failure = lookup
            .lookup_host("nonexistent-xyz123.invalid")
            .await
            .unwrap_err();

        assert_eq!(failure.kind, LookupFailureKind::NotFound);
    }

    #[tokio::test]
    #[ignore] // requires network access
    async fn resolver_caches_real_lookups() {
        use std::sync::Arc;
        use subrecon_core::Resolver;
        use tokio_util::sync::CancellationToken;

        let backend = Arc::new(HickoryLookup::new(&ResolverConfig::default()).unwrap());
        let resolver = Resolver::new(backend, ResolverConfig::default());
        let cancel = CancellationToken::new();

        let first = resolver.resolve("example.com", &cancel).await.unwrap();
        let second = resolver.resolve("example.com", &cancel).await.unwrap();

        assert!(first.exists);
        assert_eq!(first, second);
    }
}
