//! Test doubles and common utilities for contract tests
//!
//! Sources and DNS backends here are scripted: they return canned data,
//! count their calls and record how much concurrency they observed.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use subrecon_core::error::{Error, LookupFailure, Result};
use subrecon_core::traits::{DnsLookup, SubdomainSource};
use tokio_util::sync::CancellationToken;

/// Parse an address literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// Wrap a source for the orchestrator
pub fn arc<S: SubdomainSource + 'static>(source: S) -> Arc<dyn SubdomainSource> {
    Arc::new(source)
}

/// A source that returns a fixed host list, optionally after a delay
pub struct StaticSource {
    name: String,
    hosts: Vec<String>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub fn new(name: &str, hosts: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call counter
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl SubdomainSource for StaticSource {
    async fn run(&self, _domain: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.hosts.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// A source that always fails
pub struct FailingSource {
    name: String,
    message: String,
}

impl FailingSource {
    pub fn new(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl SubdomainSource for FailingSource {
    async fn run(&self, _domain: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        Err(Error::source_error(&self.name, &self.message))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// A source that never finishes on its own
///
/// Records whether its future was dropped before completing, which is how
/// the orchestrator abandons a source once the run is cancelled.
pub struct HangingSource {
    name: String,
    abandoned: Arc<AtomicBool>,
}

impl HangingSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set once the pending call has been dropped
    pub fn abandoned(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abandoned)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl SubdomainSource for HangingSource {
    async fn run(&self, _domain: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        let _flag = DropFlag(Arc::clone(&self.abandoned));
        std::future::pending::<()>().await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// A source that panics when run
pub struct PanickingSource(pub &'static str);

#[async_trait::async_trait]
impl SubdomainSource for PanickingSource {
    async fn run(&self, _domain: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        panic!("source {} exploded", self.0);
    }

    fn name(&self) -> &str {
        self.0
    }

    fn needs_key(&self) -> bool {
        false
    }
}

/// Tracks how many callers are inside a section at once
#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest concurrency observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// A source that holds its slot for a while and reports to a probe
pub struct ProbedSource {
    name: String,
    probe: Arc<ConcurrencyProbe>,
    hold: Duration,
}

impl ProbedSource {
    pub fn new(name: &str, probe: Arc<ConcurrencyProbe>, hold: Duration) -> Self {
        Self {
            name: name.to_string(),
            probe,
            hold,
        }
    }
}

#[async_trait::async_trait]
impl SubdomainSource for ProbedSource {
    async fn run(&self, domain: &str, _cancel: &CancellationToken) -> Result<Vec<String>> {
        self.probe.enter();
        tokio::time::sleep(self.hold).await;
        self.probe.exit();
        Ok(vec![format!("{}.{}", self.name, domain)])
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn needs_key(&self) -> bool {
        false
    }
}

type Answer = std::result::Result<Vec<IpAddr>, LookupFailure>;

/// A DNS backend answering from a script
///
/// - Known hosts answer from their own queue; the last answer repeats.
/// - Unknown hosts (such as random wildcard probes) take the next answer
///   from a shared queue, then fall back to NXDOMAIN.
#[derive(Default)]
pub struct ScriptedLookup {
    hosts: Mutex<HashMap<String, VecDeque<Answer>>>,
    unknown: Mutex<VecDeque<Answer>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    delay: Option<Duration>,
    probe: Option<Arc<ConcurrencyProbe>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `host` with `addresses`
    pub fn answer(self, host: &str, addresses: &[&str]) -> Self {
        let addresses = addresses.iter().map(|a| ip(a)).collect();
        self.script(host, vec![Ok(addresses)])
    }

    /// Answer `host` with `answers` in order, repeating the last one
    pub fn script(self, host: &str, answers: Vec<Answer>) -> Self {
        self.hosts
            .lock()
            .unwrap()
            .insert(host.to_string(), answers.into());
        self
    }

    /// Queue an answer for the next unknown host
    pub fn unknown(self, answer: Answer) -> Self {
        self.unknown.lock().unwrap().push_back(answer);
        self
    }

    /// Queue an address answer for the next unknown host
    pub fn probe_answer(self, addresses: &[&str]) -> Self {
        self.unknown(Ok(addresses.iter().map(|a| ip(a)).collect()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_probe(mut self, probe: Arc<ConcurrencyProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Lookups performed for `host`
    pub fn calls_for(&self, host: &str) -> usize {
        self.calls.lock().unwrap().get(host).copied().unwrap_or(0)
    }

    /// Lookups performed in total
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    fn next_answer(&self, host: &str) -> Answer {
        if let Some(queue) = self.hosts.lock().unwrap().get_mut(host) {
            return match queue.len() {
                0 => Err(LookupFailure::not_found(host)),
                1 => queue[0].clone(),
                _ => queue.pop_front().unwrap(),
            };
        }
        self.unknown
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LookupFailure::not_found(format!("no such host {}", host))))
    }
}

#[async_trait::async_trait]
impl DnsLookup for ScriptedLookup {
    async fn lookup_host(&self, hostname: &str) -> std::result::Result<Vec<IpAddr>, LookupFailure> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(hostname.to_string()).or_insert(0) += 1;
        let answer = self.next_answer(hostname);

        if let Some(probe) = &self.probe {
            probe.enter();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(probe) = &self.probe {
            probe.exit();
        }

        answer
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
