//! Core traits for SubRecon
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`SubdomainSource`]: Query a passive data source for hostnames
//! - [`DnsLookup`]: Resolve a hostname to addresses

pub mod dns_lookup;
pub mod source;

pub use dns_lookup::DnsLookup;
pub use source::{SourceFactory, SubdomainSource};
