//! Contract Test: Wildcard Detection and Filtering
//!
//! Constraints verified:
//! - Two of three probes sharing an address marks a wildcard with exactly
//!   the shared set
//! - Disjoint or mostly failing probes do not
//! - Detection probes at most once per domain, also for concurrent callers
//! - Filtering removes only hosts that resolve into the wildcard set
//! - Filtering fails open when detection cannot complete

mod common;

use common::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use subrecon_core::engine::AttributedHost;
use subrecon_core::error::LookupFailure;
use subrecon_core::{Resolver, ResolverConfig};
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

fn resolver(lookup: Arc<ScriptedLookup>) -> Resolver {
    Resolver::new(lookup, ResolverConfig::default())
}

fn attributed(host: &str) -> AttributedHost {
    AttributedHost {
        host: host.to_string(),
        source: "test".to_string(),
        discovered_at: chrono::Utc::now(),
        addresses: None,
    }
}

#[tokio::test]
async fn two_probes_sharing_an_address_mark_a_wildcard() {
    let lookup = Arc::new(
        ScriptedLookup::new()
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7", "203.0.113.8"])
            .unknown(Err(LookupFailure::not_found("NXDOMAIN"))),
    );
    let resolver = resolver(lookup.clone());

    let verdict = assert_ok!(resolver.detect_wildcard("example.com", &CancellationToken::new()).await);

    assert!(verdict.is_wildcard());
    assert_eq!(verdict.addresses, BTreeSet::from([ip("203.0.113.7")]));
    assert_eq!(lookup.total_calls(), 3);
}

#[tokio::test]
async fn disjoint_probe_answers_are_not_a_wildcard() {
    let lookup = Arc::new(
        ScriptedLookup::new()
            .probe_answer(&["198.51.100.1"])
            .probe_answer(&["198.51.100.2"])
            .probe_answer(&["198.51.100.3"]),
    );
    let resolver = resolver(lookup);

    let verdict = assert_ok!(resolver.detect_wildcard("example.com", &CancellationToken::new()).await);

    assert!(!verdict.is_wildcard());
}

#[tokio::test]
async fn a_single_resolving_probe_is_not_a_wildcard() {
    let lookup = Arc::new(ScriptedLookup::new().probe_answer(&["198.51.100.1"]));
    let resolver = resolver(lookup);

    let verdict = assert_ok!(resolver.detect_wildcard("example.com", &CancellationToken::new()).await);

    assert!(!verdict.is_wildcard());
}

#[tokio::test]
async fn detection_probes_once_per_domain() {
    let lookup = Arc::new(
        ScriptedLookup::new()
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7"]),
    );
    let resolver = Arc::new(resolver(lookup.clone()));
    let cancel = CancellationToken::new();

    let (a, b) = tokio::join!(
        resolver.detect_wildcard("example.com", &cancel),
        resolver.detect_wildcard("EXAMPLE.com", &cancel),
    );
    let c = resolver.detect_wildcard("example.com", &cancel).await;

    assert_eq!(assert_ok!(a), assert_ok!(b));
    assert!(assert_ok!(c).is_wildcard());
    assert_eq!(lookup.total_calls(), 3);
}

#[tokio::test]
async fn filtering_removes_only_wildcard_matches() {
    let lookup = Arc::new(
        ScriptedLookup::new()
            .answer("real.example.com", &["192.0.2.10"])
            .answer("fake.example.com", &["203.0.113.7"])
            .answer("mixed.example.com", &["192.0.2.11", "203.0.113.7"])
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7"]),
    );
    let resolver = resolver(lookup);
    let cancel = CancellationToken::new();

    let hosts = vec![
        "real.example.com".to_string(),
        "fake.example.com".to_string(),
        "mixed.example.com".to_string(),
        "gone.example.com".to_string(),
    ];
    let kept = resolver.filter_wildcards(hosts, "example.com", &cancel).await;

    assert_eq!(kept, vec!["real.example.com", "gone.example.com"]);
    assert!(assert_ok!(resolver.is_wildcard_match("fake.example.com", "example.com", &cancel).await));
    assert!(!assert_ok!(resolver.is_wildcard_match("gone.example.com", "example.com", &cancel).await));
}

#[tokio::test]
async fn filtering_without_wildcard_keeps_everything() {
    let lookup = Arc::new(ScriptedLookup::new().answer("www.example.com", &["192.0.2.1"]));
    let resolver = resolver(lookup);

    let hosts = vec!["www.example.com".to_string(), "api.example.com".to_string()];
    let kept = resolver
        .filter_wildcards(hosts.clone(), "example.com", &CancellationToken::new())
        .await;

    assert_eq!(kept, hosts);
}

#[tokio::test]
async fn filtering_fails_open_when_detection_is_cancelled() {
    let lookup = Arc::new(ScriptedLookup::new());
    let resolver = resolver(lookup.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let hosts = vec!["a.example.com".to_string(), "b.example.com".to_string()];
    let kept = resolver.filter_wildcards(hosts.clone(), "example.com", &cancel).await;

    assert_eq!(kept, hosts);
    assert_eq!(lookup.total_calls(), 0);
}

#[tokio::test]
async fn verification_attaches_addresses_and_drops_false_positives() {
    let lookup = Arc::new(
        ScriptedLookup::new()
            .answer("www.example.com", &["192.0.2.1"])
            .answer("wild.example.com", &["203.0.113.7"])
            .probe_answer(&["203.0.113.7"])
            .probe_answer(&["203.0.113.7"]),
    );
    let resolver = resolver(lookup);

    let verified = assert_ok!(
        resolver
            .verify(
                vec![
                    attributed("www.example.com"),
                    attributed("wild.example.com"),
                    attributed("dead.example.com"),
                ],
                "example.com",
                4,
                &CancellationToken::new(),
            )
            .await
    );

    assert_eq!(verified.len(), 1);
    assert_eq!(verified[0].host, "www.example.com");
    assert_eq!(verified[0].addresses, Some(vec![ip("192.0.2.1")]));
}
