// # subrecon - Subdomain Enumeration CLI
//
// This binary is a THIN integration layer:
// - Enumeration, retry, rate limiting and DNS logic live in subrecon-core
// - Source adapters live in subrecon-sources
// - The DNS backend lives in subrecon-dns-hickory (feature `active`)
//
// The binary is responsible for:
// 1. Parsing flags and loading `config.yaml` / `provider-config.yaml`
// 2. Initializing logging and the runtime
// 3. Building the selected sources from the registry
// 4. Running the orchestrator per domain, then filtering, verifying and writing results
//
// ## Configuration
//
// Flags override file values. API keys may also come from the environment:
// - `<SOURCE>_API_KEY` or `SUBRECON_<SOURCE>_API_KEY` (e.g. `ALIENVAULT_API_KEY`)
// - `SUBRECON_LOG_LEVEL`: trace, debug, info, warn, error (default: warn)
//
// ## Example
//
// ```bash
// export ALIENVAULT_API_KEY=your_key
// subrecon -d example.com --active --json -o results.jsonl
// ```

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use subrecon_core::domain::validate_domain;
use subrecon_core::output::{formatter_for, write_results};
use subrecon_core::{
    AttributedHost, Error, HostFilter, Orchestrator, OutputFormat, ProvidersConfig, Resolver,
    SourceRegistry, SubdomainSource, SubreconConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum SubreconExitCode {
    /// Enumeration finished (with or without results)
    Success = 0,
    /// Invalid flags, configuration or input
    ConfigError = 1,
    /// Runtime failure (output, interruption, runtime setup)
    RuntimeError = 2,
}

impl From<SubreconExitCode> for ExitCode {
    fn from(code: SubreconExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Passive subdomain enumeration
#[derive(Debug, Parser)]
#[command(name = "subrecon", version, about)]
struct Args {
    /// Target domain (e.g. example.com)
    #[arg(short, long)]
    domain: Option<String>,

    /// File containing one domain per line
    #[arg(long = "domain-list", visible_alias = "dL")]
    domain_list: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Comma-separated list of sources to use (default: all)
    #[arg(short, long, value_delimiter = ',')]
    sources: Vec<String>,

    /// Comma-separated list of sources to exclude
    #[arg(long = "exclude-sources", value_delimiter = ',')]
    exclude_sources: Vec<String>,

    /// Output JSON lines
    #[arg(long)]
    json: bool,

    /// Only print results
    #[arg(long)]
    silent: bool,

    /// Deadline for each domain's enumeration (in seconds)
    #[arg(long)]
    timeout: Option<u64>,

    /// Number of concurrent workers
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Path to the main configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to the source configuration file
    #[arg(long, default_value = "provider-config.yaml")]
    provider_config: PathBuf,

    /// Verify hosts via DNS and drop wildcard matches
    #[arg(long)]
    active: bool,

    /// Keep only hosts matching these regexes (comma-separated or @file)
    #[arg(short = 'm', long = "match")]
    match_patterns: Vec<String>,

    /// Drop hosts matching these regexes (comma-separated or @file)
    #[arg(short = 'f', long = "filter")]
    filter_patterns: Vec<String>,

    /// Requests per second for every source (0 = unlimited)
    #[arg(long)]
    rate_limit: Option<u32>,

    /// HTTP proxy URL for every source
    #[arg(long)]
    proxy: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Merge flags over the loaded configuration
    fn apply_overrides(&self, config: &mut SubreconConfig) -> Result<()> {
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(threads) = self.threads {
            config.workers = threads;
        }
        if let Some(proxy) = &self.proxy {
            config.http.proxy = Some(proxy.clone());
        }
        if self.json {
            config.output.format = OutputFormat::Json;
        }
        if self.active {
            config.dns.enabled = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(())
    }

    /// Log level from `--verbose` / `--silent` / `SUBRECON_LOG_LEVEL`
    fn log_level(&self) -> Result<Level> {
        if self.silent {
            return Ok(Level::ERROR);
        }
        if self.verbose {
            return Ok(Level::DEBUG);
        }

        let level = env::var("SUBRECON_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        match level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "SUBRECON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                level
            ),
        }
    }

    /// Domains from `-d` and `--domain-list`, in order
    fn domains(&self) -> Result<Vec<String>> {
        let mut domains = Vec::new();

        if let Some(domain) = &self.domain {
            domains.push(domain.trim().to_string());
        }

        if let Some(path) = &self.domain_list {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read domain list {}", path.display()))?;
            domains.extend(
                content
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    .map(str::to_string),
            );
        }

        domains.retain(|d| !d.is_empty());
        if domains.is_empty() {
            anyhow::bail!("either -d or --domain-list is required");
        }

        Ok(domains)
    }

    fn host_filter(&self) -> Result<HostFilter> {
        let mut filter = HostFilter::new();
        for spec in &self.match_patterns {
            filter
                .add_match_pattern(spec)
                .with_context(|| format!("invalid match pattern '{}'", spec))?;
        }
        for spec in &self.filter_patterns {
            filter
                .add_exclude_pattern(spec)
                .with_context(|| format!("invalid filter pattern '{}'", spec))?;
        }
        Ok(filter)
    }
}

/// Everything a run needs, resolved before any network traffic
struct Plan {
    domains: Vec<String>,
    config: SubreconConfig,
    orchestrator: Orchestrator,
    filter: HostFilter,
    resolver: Option<Resolver>,
    output: Option<PathBuf>,
}

impl Plan {
    fn build(args: &Args, config: SubreconConfig) -> Result<Self> {
        let domains = args.domains()?;
        let filter = args.host_filter()?;

        let providers = ProvidersConfig::load(&args.provider_config)
            .with_context(|| format!("failed to load {}", args.provider_config.display()))?;

        let registry = SourceRegistry::new();
        subrecon_sources::register(&registry);

        let selected = select_sources(&registry, &args.sources, &args.exclude_sources)?;
        let (sources, rates) =
            build_sources(&registry, &providers, &config, &selected, args.rate_limit)?;
        if sources.is_empty() {
            anyhow::bail!("no sources available");
        }

        let orchestrator = Orchestrator::new(sources, config.orchestrator())?;
        for (name, rate) in rates {
            orchestrator.set_rate_limit(&name, rate);
        }

        let resolver = if config.dns.enabled {
            Some(build_resolver(&config)?)
        } else {
            None
        };

        Ok(Self {
            domains,
            config,
            orchestrator,
            filter,
            resolver,
            output: args.output.clone(),
        })
    }
}

/// Source names after `--sources` / `--exclude-sources`
fn select_sources(
    registry: &SourceRegistry,
    requested: &[String],
    excluded: &[String],
) -> Result<Vec<String>> {
    let requested: Vec<String> = if requested.is_empty() {
        subrecon_sources::SOURCE_NAMES
            .iter()
            .map(|name| name.to_string())
            .collect()
    } else {
        requested
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect()
    };

    let excluded: HashSet<String> = excluded.iter().map(|name| name.trim().to_lowercase()).collect();

    let mut selected = Vec::new();
    for name in requested {
        if !registry.has_source(&name) {
            anyhow::bail!(
                "unknown source '{}'. Available sources: {}",
                name,
                registry.list_sources().join(", ")
            );
        }
        if !excluded.contains(&name) && !selected.contains(&name) {
            selected.push(name);
        }
    }

    Ok(selected)
}

type BuiltSources = (Vec<Arc<dyn SubdomainSource>>, Vec<(String, u32)>);

/// Instantiate selected sources, skipping disabled and keyless ones
///
/// Returns the sources and the rate limit to apply to each. `rate_override`
/// (from `--rate-limit`) replaces every per-source rate.
fn build_sources(
    registry: &SourceRegistry,
    providers: &ProvidersConfig,
    config: &SubreconConfig,
    selected: &[String],
    rate_override: Option<u32>,
) -> Result<BuiltSources> {
    let mut sources: Vec<Arc<dyn SubdomainSource>> = Vec::new();
    let mut rates = Vec::new();

    for name in selected {
        if !providers.is_enabled(name) {
            debug!(source = %name, "Source disabled in provider config");
            continue;
        }

        let configured = providers.sources.contains_key(name);
        let mut source_config = providers.source_config(name);
        if !configured {
            source_config.rate_limit = config.rate_limit;
            source_config.user_agent = config.http.user_agent.clone();
            source_config.timeout = config.http.timeout;
        }
        if source_config.proxy.is_none() {
            source_config.proxy = config.http.proxy.clone();
        }

        let source = registry.create_source(name, &source_config)?;
        if source.needs_key() && source_config.api_key().is_none() {
            warn!(source = %name, "Source requires an API key, skipping");
            continue;
        }

        let rate = rate_override.unwrap_or(source_config.rate_limit);
        rates.push((name.clone(), rate));
        sources.push(Arc::from(source));
    }

    Ok((sources, rates))
}

#[cfg(feature = "active")]
fn build_resolver(config: &SubreconConfig) -> Result<Resolver> {
    let resolver_config = config.dns.resolver(config.workers)?;
    let backend = subrecon_dns_hickory::HickoryLookup::new(&resolver_config)?;
    Ok(Resolver::new(Arc::new(backend), resolver_config))
}

#[cfg(not(feature = "active"))]
fn build_resolver(_config: &SubreconConfig) -> Result<Resolver> {
    anyhow::bail!("--active requires subrecon to be built with the `active` feature")
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match SubreconConfig::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SubreconExitCode::ConfigError.into();
        }
    };

    if let Err(e) = args.apply_overrides(&mut config) {
        eprintln!("Configuration validation error: {:#}", e);
        return SubreconExitCode::ConfigError.into();
    }

    let log_level = match args.log_level() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return SubreconExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SubreconExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SubreconExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let plan = match Plan::build(&args, config) {
            Ok(plan) => plan,
            Err(e) => {
                error!("{:#}", e);
                return SubreconExitCode::ConfigError;
            }
        };

        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_interrupt(cancel.clone()));

        match run(plan, &cancel).await {
            Ok(()) => SubreconExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                SubreconExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Cancel the run on Ctrl-C
async fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => {
                warn!("Interrupted, stopping enumeration");
                cancel.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        },
        _ = cancel.cancelled() => {}
    }
}

/// Enumerate every domain and write the collected results
async fn run(plan: Plan, cancel: &CancellationToken) -> Result<()> {
    let mut results: Vec<AttributedHost> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for domain in &plan.domains {
        if cancel.is_cancelled() {
            break;
        }

        if let Err(e) = validate_domain(domain) {
            warn!(domain = %domain, "Skipping invalid domain: {}", e);
            continue;
        }

        let hosts = match enumerate(&plan, domain, cancel).await {
            Ok(hosts) => hosts,
            Err(Error::Cancelled) => break,
            Err(e) => {
                error!(domain = %domain, "Enumeration failed: {}", e);
                continue;
            }
        };

        for host in hosts {
            if !plan.config.output.unique || seen.insert(host.host.clone()) {
                results.push(host);
            }
        }
    }

    if results.is_empty() {
        warn!("No subdomains found");
    } else {
        let formatter = formatter_for(plan.config.output.format, plan.config.output.sort);
        write_results(&results, formatter.as_ref(), plan.output.as_deref())
            .context("failed to write output")?;

        if let Some(path) = plan.output.as_deref().filter(|p| *p != Path::new("-")) {
            info!("Results saved to {}", path.display());
        }
    }

    if cancel.is_cancelled() {
        anyhow::bail!("interrupted, results may be incomplete");
    }

    Ok(())
}

/// Enumerate, filter and optionally verify one domain
async fn enumerate(
    plan: &Plan,
    domain: &str,
    cancel: &CancellationToken,
) -> subrecon_core::Result<Vec<AttributedHost>> {
    info!(domain, sources = ?plan.orchestrator.source_names(), "Enumerating");

    let enumeration = plan.orchestrator.run_with_cancel(domain, cancel).await?;
    for failure in &enumeration.failures {
        debug!(source = %failure.source, kind = ?failure.kind, "Source failed: {}", failure.message);
    }
    info!(domain, found = enumeration.hosts.len(), "Enumeration finished");

    let hosts = plan.filter.apply(enumeration.hosts);

    match &plan.resolver {
        Some(resolver) => {
            let verified = resolver
                .verify(hosts, domain, plan.config.workers, cancel)
                .await?;
            info!(domain, verified = verified.len(), "DNS verification finished");
            Ok(verified)
        }
        None => Ok(hosts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(flags: &[&str]) -> Args {
        let mut argv = vec!["subrecon"];
        argv.extend_from_slice(flags);
        Args::parse_from(argv)
    }

    #[test]
    fn flags_override_file_values() {
        let args = parse(&["-d", "example.com", "-t", "20", "--timeout", "5", "--json", "--active"]);
        let mut config = SubreconConfig::new();

        args.apply_overrides(&mut config).unwrap();

        assert_eq!(config.workers, 20);
        assert_eq!(config.timeout, 5);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.dns.enabled);
    }

    #[test]
    fn out_of_range_threads_are_rejected() {
        let args = parse(&["-d", "example.com", "-t", "500"]);
        let mut config = SubreconConfig::new();

        assert!(args.apply_overrides(&mut config).is_err());
    }

    #[test]
    fn domain_is_required() {
        let args = parse(&[]);
        assert!(args.domains().is_err());
    }

    #[test]
    fn domain_list_skips_blank_and_comment_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# targets\nexample.com\n\n  example.org  ").unwrap();

        let args = parse(&["-d", "example.net", "--domain-list", file.path().to_str().unwrap()]);
        let domains = args.domains().unwrap();

        assert_eq!(domains, vec!["example.net", "example.com", "example.org"]);
    }

    #[test]
    fn source_selection_honours_exclusions() {
        let registry = SourceRegistry::new();
        subrecon_sources::register(&registry);

        let selected = select_sources(
            &registry,
            &["crtsh".into(), "urlscan".into(), "crtsh".into()],
            &["urlscan".into()],
        )
        .unwrap();

        assert_eq!(selected, vec!["crtsh"]);
    }

    #[test]
    fn unknown_source_is_an_error() {
        let registry = SourceRegistry::new();
        subrecon_sources::register(&registry);

        let err = select_sources(&registry, &["shodan".into()], &[]).unwrap_err();
        assert!(err.to_string().contains("unknown source 'shodan'"));
    }

    #[test]
    fn keyless_required_sources_are_skipped() {
        let registry = SourceRegistry::new();
        subrecon_sources::register(&registry);

        let (sources, rates) = build_sources(
            &registry,
            &ProvidersConfig::default(),
            &SubreconConfig::new(),
            &["crtsh".into(), "alienvault".into()],
            Some(2),
        )
        .unwrap();

        // alienvault is only kept when an API key happens to be exported
        assert!(sources.iter().any(|s| s.name() == "crtsh"));
        assert_eq!(sources.len(), rates.len());
        assert!(rates.iter().all(|(_, rate)| *rate == 2));
    }
}
