//! Plugin-based source registry
//!
//! The registry allows subdomain sources to be registered dynamically at
//! runtime, avoiding hardcoded if-else chains.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use subrecon_core::registry::SourceRegistry;
//! use subrecon_core::config::SourceConfig;
//!
//! let registry = SourceRegistry::new();
//! subrecon_sources::register(&registry);
//!
//! let source = registry.create_source("crtsh", &SourceConfig::default())?;
//! ```
//!
//! Source crates register themselves through a `register(&SourceRegistry)`
//! function.

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::traits::{SourceFactory, SubdomainSource};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Source registry for plugin-based source creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct SourceRegistry {
    sources: RwLock<HashMap<String, Box<dyn SourceFactory>>>,
}

impl SourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source factory under `name`, replacing any previous one
    pub fn register_source(&self, name: impl Into<String>, factory: Box<dyn SourceFactory>) {
        let mut sources = self.sources.write().unwrap_or_else(PoisonError::into_inner);
        sources.insert(name.into(), factory);
    }

    /// Create a source by name
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn SubdomainSource>)`: Created source instance
    /// - `Err(Error::Config)`: If no factory is registered under `name`
    /// - `Err(Error)`: If the factory rejects the configuration
    pub fn create_source(
        &self,
        name: &str,
        config: &SourceConfig,
    ) -> Result<Box<dyn SubdomainSource>> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);

        let factory = sources
            .get(name)
            .ok_or_else(|| Error::config(format!("Unknown source: {}", name)))?;

        factory.create(config)
    }

    /// List all registered source names, sorted
    pub fn list_sources(&self) -> Vec<String> {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = sources.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a source name is registered
    pub fn has_source(&self, name: &str) -> bool {
        let sources = self.sources.read().unwrap_or_else(PoisonError::into_inner);
        sources.contains_key(name)
    }
}
