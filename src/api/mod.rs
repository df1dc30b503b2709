//! HTTP API
//!
//! Thin axum layer over [`crate::transcript::TranscriptFetcher`].

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
