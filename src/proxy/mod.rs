//! Proxy sourcing
//!
//! This module provides:
//! - Proxy-list providers (plain text and geonode JSON)
//! - The shared proxy pool with lazy refresh and random selection

pub mod provider;
pub mod source;

pub use provider::{HttpListProvider, ListFormat, ProviderSpec, ProxyProvider};
pub use source::{CandidateSource, DirectConnection, ProxySource};
