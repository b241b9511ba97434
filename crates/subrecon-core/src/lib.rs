// # subrecon-core
//
// Core library for passive subdomain enumeration and DNS verification.
//
// ## Architecture Overview
//
// This library provides the core functionality for discovering hostnames:
// - **SubdomainSource**: Trait for passive data sources (certificate logs, APIs)
// - **DnsLookup**: Trait for single-shot hostname resolution backends
// - **Orchestrator**: Fans sources out under a worker pool, rate limits and a deadline
// - **Resolver**: Cached, retried resolution with wildcard detection
// - **SourceRegistry**: Plugin-based registry for source factories
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from source and DNS implementations
// 2. **Partial Failure**: One failing source never sinks the run
// 3. **Plugin-Based**: Sources are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Cancellation**: Every blocking point observes a `CancellationToken`

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod domain;
pub mod ratelimit;
pub mod resolve;
pub mod filter;
pub mod output;

// Re-export core types for convenience
pub use traits::{DnsLookup, SourceFactory, SubdomainSource};
pub use engine::{AttributedHost, Enumeration, Orchestrator, OrchestratorConfig, SourceOutcome};
pub use registry::SourceRegistry;
pub use config::{OutputFormat, ProvidersConfig, SourceConfig, SubreconConfig};
pub use error::{Error, LookupFailure, LookupFailureKind, Result, SourceFailure, SourceFailureKind};
pub use ratelimit::RateLimiters;
pub use resolve::{Resolution, ResolutionCache, Resolver, ResolverConfig, WildcardVerdict};
pub use filter::HostFilter;
pub use output::{Formatter, JsonFormatter, TextFormatter};
