//! Regex host filtering
//!
//! Match patterns keep only hosts matching at least one of them (when any
//! are configured); exclude patterns drop hosts matching any of them.
//! Patterns are given as a comma-separated list or as `@path` to a file with
//! one pattern per line (`#` starts a comment line).

use crate::engine::AttributedHost;
use crate::error::Result;
use regex::Regex;
use std::path::Path;
use tracing::debug;

/// Match/exclude filter over hostnames
#[derive(Debug, Clone, Default)]
pub struct HostFilter {
    match_patterns: Vec<Regex>,
    exclude_patterns: Vec<Regex>,
}

impl HostFilter {
    /// Create a filter that keeps everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Add match patterns from a comma-separated list or `@file`
    pub fn add_match_pattern(&mut self, spec: &str) -> Result<()> {
        let patterns = parse_patterns(spec)?;
        self.match_patterns.extend(patterns);
        Ok(())
    }

    /// Add exclude patterns from a comma-separated list or `@file`
    pub fn add_exclude_pattern(&mut self, spec: &str) -> Result<()> {
        let patterns = parse_patterns(spec)?;
        self.exclude_patterns.extend(patterns);
        Ok(())
    }

    /// Whether no pattern is configured
    pub fn is_empty(&self) -> bool {
        self.match_patterns.is_empty() && self.exclude_patterns.is_empty()
    }

    /// Whether `host` passes the filter
    pub fn allows(&self, host: &str) -> bool {
        if !self.match_patterns.is_empty() && !self.match_patterns.iter().any(|re| re.is_match(host)) {
            return false;
        }
        !self.exclude_patterns.iter().any(|re| re.is_match(host))
    }

    /// Keep the hosts that pass the filter, preserving order
    pub fn apply(&self, hosts: Vec<AttributedHost>) -> Vec<AttributedHost> {
        if self.is_empty() {
            return hosts;
        }

        let before = hosts.len();
        let kept: Vec<AttributedHost> = hosts.into_iter().filter(|h| self.allows(&h.host)).collect();
        debug!(removed = before - kept.len(), "Host filter applied");
        kept
    }
}

fn parse_patterns(spec: &str) -> Result<Vec<Regex>> {
    match spec.trim().strip_prefix('@') {
        Some(path) => load_pattern_file(Path::new(path)),
        None => spec
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Ok(Regex::new(p)?))
            .collect(),
    }
}

fn load_pattern_file(path: &Path) -> Result<Vec<Regex>> {
    let content = std::fs::read_to_string(path)?;

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| Ok(Regex::new(line)?))
        .collect()
}
