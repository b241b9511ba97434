//! Configuration types for SubRecon
//!
//! This module defines all configuration structures used throughout the crate.
//! Both files are YAML; a missing file yields the defaults.

use crate::engine::OrchestratorConfig;
use crate::resolve::ResolverConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main SubRecon configuration (`config.yaml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubreconConfig {
    /// Per-run deadline for the source orchestrator (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default requests per second for sources without their own limit
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// DNS verification settings
    #[serde(default)]
    pub dns: DnsConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// HTTP client settings shared by sources
    #[serde(default)]
    pub http: HttpConfig,
}

impl SubreconConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            timeout: default_timeout_secs(),
            workers: default_workers(),
            rate_limit: default_rate_limit(),
            dns: DnsConfig::default(),
            output: OutputConfig::default(),
            http: HttpConfig::default(),
        }
    }

    /// Load configuration from a YAML file
    ///
    /// A missing file is not an error: the defaults are returned.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout == 0 {
            return Err(crate::Error::config("timeout must be greater than 0"));
        }

        if self.workers == 0 {
            return Err(crate::Error::config("workers must be greater than 0"));
        }

        if self.workers > 100 {
            return Err(crate::Error::config("workers cannot exceed 100"));
        }

        self.dns.validate()?;

        Ok(())
    }

    /// Per-run deadline as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Orchestrator settings derived from this configuration
    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            workers: self.workers,
            timeout: self.timeout(),
        }
    }
}

impl Default for SubreconConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// DNS resolver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Whether active verification is enabled by default
    #[serde(default)]
    pub enabled: bool,

    /// Resolver endpoints as `host:port`, first one preferred
    #[serde(default = "default_dns_servers")]
    pub servers: Vec<String>,

    /// Per-lookup timeout (in seconds)
    #[serde(default = "default_dns_timeout_secs")]
    pub timeout: u64,

    /// Total lookup attempts for retryable failures
    #[serde(default = "default_dns_retry")]
    pub retry: usize,
}

impl DnsConfig {
    /// Validate the DNS configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.timeout == 0 {
            return Err(crate::Error::config("dns.timeout must be greater than 0"));
        }

        if self.retry == 0 {
            return Err(crate::Error::config("dns.retry must be at least 1"));
        }

        self.endpoints().map(|_| ())
    }

    /// Parse the configured servers into socket addresses
    pub fn endpoints(&self) -> Result<Vec<SocketAddr>, crate::Error> {
        self.servers
            .iter()
            .map(|server| {
                server.trim().parse::<SocketAddr>().map_err(|_| {
                    crate::Error::config(format!(
                        "dns server '{}' is not a valid host:port address",
                        server
                    ))
                })
            })
            .collect()
    }

    /// Resolver settings derived from this configuration
    pub fn resolver(&self, workers: usize) -> Result<ResolverConfig, crate::Error> {
        Ok(ResolverConfig {
            endpoints: self.endpoints()?,
            timeout: Duration::from_secs(self.timeout),
            attempts: self.retry,
            workers,
            ..ResolverConfig::default()
        })
    }
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            servers: default_dns_servers(),
            timeout: default_dns_timeout_secs(),
            retry: default_dns_retry(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One hostname per line
    #[default]
    Text,
    /// JSON lines with attribution metadata
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Sort results by hostname
    #[serde(default = "default_true")]
    pub sort: bool,

    /// Drop duplicate hostnames across domains
    #[serde(default = "default_true")]
    pub unique: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            sort: true,
            unique: true,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User agent sent by sources without their own
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub timeout: u64,

    /// Optional proxy URL
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_http_timeout_secs(),
            proxy: None,
        }
    }
}

/// Source configuration file (`provider-config.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Per-source settings keyed by source name
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
}

impl ProvidersConfig {
    /// Load source configuration from a YAML file
    ///
    /// A missing file yields an empty configuration. API keys found in the
    /// environment (`<NAME>_API_KEY` or `SUBRECON_<NAME>_API_KEY`) override
    /// the values from the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Self>(&content)?
        } else {
            tracing::debug!("Provider config {} not found, using defaults", path.display());
            Self::default()
        };

        for (name, source) in config.sources.iter_mut() {
            if let Some(key) = env_api_key(name) {
                source.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Configuration for a specific source, falling back to defaults
    ///
    /// Sources absent from the file still pick up an API key from the environment.
    pub fn source_config(&self, name: &str) -> SourceConfig {
        match self.sources.get(name) {
            Some(config) => config.clone(),
            None => SourceConfig {
                api_key: env_api_key(name),
                ..SourceConfig::default()
            },
        }
    }

    /// Whether a source is enabled (sources absent from the file are enabled)
    pub fn is_enabled(&self, name: &str) -> bool {
        self.sources.get(name).is_none_or(|config| config.enabled)
    }
}

/// Per-source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// API key, when the source uses one
    #[serde(default)]
    pub api_key: Option<String>,

    /// Requests per second (0 = unlimited)
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,

    /// Request timeout (in seconds)
    #[serde(default = "default_source_timeout_secs")]
    pub timeout: u64,

    /// Whether this source is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Total request attempts
    #[serde(default = "default_source_retry")]
    pub retry: usize,

    /// User agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Upper bound on hostnames returned by the source
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Optional proxy URL (filled from the HTTP settings when unset)
    #[serde(default)]
    pub proxy: Option<String>,
}

impl SourceConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        if self.timeout == 0 {
            Duration::from_secs(default_source_timeout_secs())
        } else {
            Duration::from_secs(self.timeout)
        }
    }

    /// The configured API key, ignoring empty strings
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            rate_limit: default_rate_limit(),
            timeout: default_source_timeout_secs(),
            enabled: true,
            retry: default_source_retry(),
            user_agent: default_user_agent(),
            max_results: default_max_results(),
            proxy: None,
        }
    }
}

/// Look up an API key for `source` in the environment
fn env_api_key(source: &str) -> Option<String> {
    let upper = source.to_uppercase().replace('-', "_");
    [format!("{}_API_KEY", upper), format!("SUBRECON_{}_API_KEY", upper)]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_workers() -> usize {
    10
}

fn default_rate_limit() -> u32 {
    5
}

fn default_dns_servers() -> Vec<String> {
    vec!["8.8.8.8:53".to_string(), "1.1.1.1:53".to_string()]
}

fn default_dns_timeout_secs() -> u64 {
    5
}

fn default_dns_retry() -> usize {
    3
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_source_timeout_secs() -> u64 {
    30
}

fn default_source_retry() -> usize {
    3
}

fn default_max_results() -> usize {
    10_000
}

fn default_user_agent() -> String {
    "SubRecon/1.0".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = SubreconConfig::load("/nonexistent/subrecon/config.yaml").unwrap();

        assert_eq!(config.timeout, 30);
        assert_eq!(config.workers, 10);
        assert_eq!(config.dns.servers, vec!["8.8.8.8:53", "1.1.1.1:53"]);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn partial_yaml_keeps_defaults_for_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "workers: 25\ndns:\n  servers: [\"9.9.9.9:53\"]\noutput:\n  format: json").unwrap();

        let config = SubreconConfig::load(file.path()).unwrap();

        assert_eq!(config.workers, 25);
        assert_eq!(config.timeout, 30);
        assert_eq!(config.dns.retry, 3);
        assert_eq!(config.dns.endpoints().unwrap(), vec!["9.9.9.9:53".parse().unwrap()]);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn validation_rejects_out_of_range_workers() {
        let mut config = SubreconConfig::new();
        config.workers = 0;
        assert!(config.validate().is_err());

        config.workers = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validation_rejects_malformed_dns_server() {
        let mut config = SubreconConfig::new();
        config.dns.servers = vec!["8.8.8.8".to_string()];

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("8.8.8.8"));
    }

    #[test]
    fn unknown_sources_default_to_enabled() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "sources:\n  crtsh:\n    enabled: false\n  urlscan:\n    rate_limit: 1\n    api_key: abc"
        )
        .unwrap();

        let config = ProvidersConfig::load(file.path()).unwrap();

        assert!(!config.is_enabled("crtsh"));
        assert!(config.is_enabled("urlscan"));
        assert!(config.is_enabled("hackertarget"));
        assert_eq!(config.source_config("urlscan").rate_limit, 1);
        assert_eq!(config.source_config("urlscan").api_key(), Some("abc"));
        assert_eq!(config.source_config("hackertarget").rate_limit, 5);
    }

    #[test]
    fn resolver_settings_follow_dns_section() {
        let dns = DnsConfig {
            timeout: 2,
            retry: 4,
            ..DnsConfig::default()
        };

        let resolver = dns.resolver(20).unwrap();

        assert_eq!(resolver.endpoints.len(), 2);
        assert_eq!(resolver.timeout, Duration::from_secs(2));
        assert_eq!(resolver.attempts, 4);
        assert_eq!(resolver.workers, 20);
    }
}
