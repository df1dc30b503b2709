//! Transcript Relay - YouTube transcripts through rotating proxies
//!
//! ## Features
//!
//! - Transcript fetch and listing over a small HTTP API
//! - Proxy pool refreshed on demand from public proxy-list providers
//! - Bounded retry loop that rotates proxies when YouTube blocks an IP
//! - Permissive CORS for browser clients

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod proxy;
pub mod transcript;

pub use config::Config;
pub use error::{RelayError, Result};
