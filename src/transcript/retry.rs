//! Proxy-rotating retry loop around the transcript source
//!
//! Every attempt draws a fresh proxy. Failures are classified as:
//! - not-found: the video has no matching transcript, stop immediately
//! - retryable: the upstream blocked the proxy's IP and attempts remain
//! - terminal: anything else, or a block on the final attempt

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{SourceError, TranscriptSource};
use crate::error::{RelayError, Result};
use crate::models::{FetchedTranscript, ProxyCandidate, TranscriptMetadata};
use crate::proxy::CandidateSource;

/// Substring that marks an IP-based block in an upstream error message.
/// Matched case-sensitively.
pub const IP_BLOCK_TOKEN: &str = "IP";

/// Retry loop configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Upper bound on upstream calls per request
    pub max_attempts: u32,
    /// Deadline for a single upstream call
    pub attempt_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// How the retry loop reacts to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    Retryable,
    Terminal,
}

/// Does this error text describe an IP-based block?
pub fn is_ip_block(message: &str) -> bool {
    message.contains(IP_BLOCK_TOKEN)
}

/// Classify the failure of attempt `index` (0-based) out of `max_attempts`.
///
/// `not_found_is_terminal` is false for listing, where "no transcript" is
/// just another terminal error.
pub fn classify(
    error: &SourceError,
    index: u32,
    max_attempts: u32,
    not_found_is_terminal: bool,
) -> FailureClass {
    if not_found_is_terminal && error.is_not_found() {
        return FailureClass::NotFound;
    }

    // Not-found messages embed the video id, which may itself contain the token.
    if !error.is_not_found() && is_ip_block(&error.to_string()) && index + 1 < max_attempts {
        return FailureClass::Retryable;
    }

    FailureClass::Terminal
}

/// One try of the retry loop
#[derive(Debug, Clone)]
pub struct FetchAttempt {
    pub index: u32,
    pub proxy: Option<ProxyCandidate>,
}

impl FetchAttempt {
    pub fn proxy_label(&self) -> &str {
        self.proxy
            .as_ref()
            .map(|p| p.address())
            .unwrap_or("direct")
    }
}

/// Runs transcript operations through rotating proxies
pub struct TranscriptFetcher {
    candidates: Arc<dyn CandidateSource>,
    source: Arc<dyn TranscriptSource>,
    config: RetryConfig,
}

impl TranscriptFetcher {
    pub fn new(
        candidates: Arc<dyn CandidateSource>,
        source: Arc<dyn TranscriptSource>,
        config: RetryConfig,
    ) -> Self {
        Self {
            candidates,
            source,
            config,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Fetch the transcript of `video_id` in `language`
    #[instrument(skip(self))]
    pub async fn fetch(&self, video_id: &str, language: &str) -> Result<FetchedTranscript> {
        let source = self.source.clone();
        let video_id = video_id.to_string();
        let language = language.to_string();

        self.run("fetch", true, move |proxy| {
            let source = source.clone();
            let video_id = video_id.clone();
            let language = language.clone();
            async move { source.fetch(&video_id, &language, proxy.as_ref()).await }
        })
        .await
    }

    /// List the transcripts available for `video_id`
    #[instrument(skip(self))]
    pub async fn list(&self, video_id: &str) -> Result<Vec<TranscriptMetadata>> {
        let source = self.source.clone();
        let video_id = video_id.to_string();

        self.run("list", false, move |proxy| {
            let source = source.clone();
            let video_id = video_id.clone();
            async move { source.list(&video_id, proxy.as_ref()).await }
        })
        .await
    }

    async fn run<T, F, Fut>(
        &self,
        operation: &'static str,
        not_found_is_terminal: bool,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut(Option<ProxyCandidate>) -> Fut + Send,
        Fut: Future<Output = std::result::Result<T, SourceError>> + Send,
        T: Send,
    {
        let max_attempts = self.max_attempts();
        let mut last_error = None;

        for index in 0..max_attempts {
            let attempt = FetchAttempt {
                index,
                proxy: self.candidates.get_candidate().await,
            };

            debug!(
                "{} through {} (attempt {}/{})",
                operation,
                attempt.proxy_label(),
                index + 1,
                max_attempts
            );

            let outcome = tokio::time::timeout(self.config.attempt_timeout, call(attempt.proxy.clone()))
                .await
                .unwrap_or(Err(SourceError::Timeout(self.config.attempt_timeout)));

            let error = match outcome {
                Ok(value) => {
                    if index > 0 {
                        info!(
                            proxy = attempt.proxy_label(),
                            "{} succeeded on attempt {}/{}",
                            operation,
                            index + 1,
                            max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            match classify(&error, index, max_attempts, not_found_is_terminal) {
                FailureClass::NotFound => {
                    info!(error = %error, "{} found no transcript", operation);
                    return Err(RelayError::TranscriptNotFound(error.to_string()));
                }
                FailureClass::Retryable => {
                    warn!(
                        proxy = attempt.proxy_label(),
                        error = %error,
                        "{} blocked (attempt {}/{}), rotating proxy",
                        operation,
                        index + 1,
                        max_attempts
                    );
                    last_error = Some(error);
                }
                FailureClass::Terminal => {
                    warn!(
                        proxy = attempt.proxy_label(),
                        error = %error,
                        "{} failed (attempt {}/{})",
                        operation,
                        index + 1,
                        max_attempts
                    );
                    return Err(RelayError::Upstream(error.to_string()));
                }
            }
        }

        // The final attempt is never classified as retryable, so this only
        // guards against a zero-length loop.
        Err(RelayError::Upstream(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("{} made no attempts", operation)),
        ))
    }
}
