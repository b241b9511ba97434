//! Domain and hostname helpers
//!
//! Target domains are validated strictly before a run; hostnames reported by
//! sources are only normalized.

use crate::error::{Error, Result};

/// Validate a target domain name
///
/// Rules (RFC 1035 style, applied to the trimmed input):
/// - non-empty, no whitespace, at most 253 characters
/// - no leading or trailing dot, at least two labels
/// - each label 1..=63 characters of alphanumerics and hyphens, not starting
///   or ending with a hyphen
pub fn validate_domain(domain: &str) -> Result<()> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(Error::invalid_input("domain cannot be empty"));
    }

    if domain.chars().any(char::is_whitespace) {
        return Err(Error::invalid_input(format!(
            "domain cannot contain spaces: '{}'",
            domain
        )));
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err(Error::invalid_input(format!(
            "domain cannot start or end with a dot: '{}'",
            domain
        )));
    }

    if domain.len() > 253 {
        return Err(Error::invalid_input(format!(
            "domain too long: {} chars (max 253)",
            domain.len()
        )));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(Error::invalid_input(format!(
            "domain must have at least two labels: '{}'",
            domain
        )));
    }

    for label in labels {
        if label.is_empty() {
            return Err(Error::invalid_input(format!(
                "domain has an empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::invalid_input(format!(
                "domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::invalid_input(format!(
                "domain label contains invalid characters: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_input(format!(
                "domain label cannot start or end with a hyphen: '{}'",
                label
            )));
        }
    }

    Ok(())
}

/// Normalize a hostname for deduplication: trimmed, lower-cased, no trailing dot
pub fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_lowercase()
}

/// Whether `host` is `domain` itself or one of its subdomains
///
/// Both arguments are expected to be normalized.
pub fn belongs_to(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_domains() {
        for domain in ["example.com", "sub.example.com", "test.co.uk", "xn--bcher-kva.example"] {
            assert!(validate_domain(domain).is_ok(), "{} should be valid", domain);
        }
    }

    #[test]
    fn rejects_malformed_domains() {
        for domain in [
            "",
            "   ",
            "invalid domain",
            ".example.com",
            "example.com.",
            "example",
            "a..example.com",
            "-bad.example.com",
            "bad_.example.com",
        ] {
            assert!(validate_domain(domain).is_err(), "{:?} should be rejected", domain);
        }
    }

    #[test]
    fn rejects_overlong_labels_and_names() {
        let label = "a".repeat(64);
        assert!(validate_domain(&format!("{}.com", label)).is_err());

        let long = format!("{}.com", ["abcdefghij"; 25].join("."));
        assert!(long.len() > 253);
        assert!(validate_domain(&long).is_err());
    }

    #[test]
    fn normalization_lowercases_and_trims() {
        assert_eq!(normalize_host("  WWW.Example.COM. "), "www.example.com");
        assert_eq!(normalize_host("api.example.com"), "api.example.com");
    }

    #[test]
    fn membership_requires_label_boundary() {
        assert!(belongs_to("example.com", "example.com"));
        assert!(belongs_to("a.b.example.com", "example.com"));
        assert!(!belongs_to("badexample.com", "example.com"));
        assert!(!belongs_to("example.com.evil.net", "example.com"));
    }
}
