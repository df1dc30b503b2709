//! Transcript retrieval
//!
//! [`TranscriptSource`] is the seam to the upstream that actually knows about
//! captions. [`TranscriptFetcher`] wraps it in the proxy-rotating retry loop.

pub mod retry;
pub mod youtube;

pub use retry::{classify, is_ip_block, FailureClass, FetchAttempt, RetryConfig, TranscriptFetcher};
pub use youtube::YouTubeTranscriptSource;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{FetchedTranscript, ProxyCandidate, TranscriptMetadata};

/// Failure reported by a transcript source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Subtitles are disabled for this video ({video_id})")]
    TranscriptsDisabled { video_id: String },

    #[error("No transcripts were found for any of the requested language codes: {requested} (video {video_id}, available: {available})")]
    NoTranscriptFound {
        video_id: String,
        requested: String,
        available: String,
    },

    #[error("YouTube is blocking requests from your IP: {reason}")]
    RequestBlocked { reason: String },

    #[error("The video is no longer available")]
    VideoUnavailable,

    #[error("The video is unplayable: {reason}")]
    Unplayable { reason: String },

    #[error("Request to YouTube failed: {0}")]
    Http(String),

    #[error("Failed to parse YouTube response: {0}")]
    Parse(String),

    #[error("Attempt timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl SourceError {
    /// The video has no transcript that could satisfy the request; no proxy
    /// can change that.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SourceError::TranscriptsDisabled { .. } | SourceError::NoTranscriptFound { .. }
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Http(err.to_string())
    }
}

/// Upstream operations that produce transcripts.
///
/// `proxy` is the forward proxy to route every request of the call through,
/// or `None` for a direct connection.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript of `video_id` in `language`
    async fn fetch(
        &self,
        video_id: &str,
        language: &str,
        proxy: Option<&ProxyCandidate>,
    ) -> Result<FetchedTranscript, SourceError>;

    /// List the transcripts available for `video_id`
    async fn list(
        &self,
        video_id: &str,
        proxy: Option<&ProxyCandidate>,
    ) -> Result<Vec<TranscriptMetadata>, SourceError>;
}
