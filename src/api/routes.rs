//! API route definitions

use axum::routing::get;
use axum::Router;

use super::handlers;
use super::server::AppState;

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health_check))
        .route(
            "/transcript/:video_id",
            get(handlers::transcript::get_transcript),
        )
        .route(
            "/transcripts/:video_id",
            get(handlers::transcript::list_transcripts),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::transcript::testing::{
        blocked, metadata, transcript, ScriptedSource, SequentialCandidates,
    };
    use crate::transcript::{RetryConfig, SourceError, TranscriptFetcher};

    fn router(source: Arc<ScriptedSource>) -> Router {
        let fetcher = TranscriptFetcher::new(
            Arc::new(SequentialCandidates::default()),
            source,
            RetryConfig::default(),
        );
        create_router(AppState::new(Arc::new(fetcher), None, "en"))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (status, body) = get_json(router(Arc::new(ScriptedSource::default())), "/").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "YouTube Transcript API");
        assert_eq!(
            body["endpoints"],
            json!(["/transcript/{video_id}", "/transcripts/{video_id}"])
        );
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body) =
            get_json(router(Arc::new(ScriptedSource::default())), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert!(body["proxy_pool"].is_null());
    }

    #[tokio::test]
    async fn test_get_transcript_after_block() {
        let source = Arc::new(ScriptedSource::with_fetch(vec![
            Err(blocked()),
            Ok(transcript("abc123", "en")),
        ]));

        let (status, body) = get_json(router(source.clone()), "/transcript/abc123?language=en").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "video_id": "abc123",
                "language": "English",
                "language_code": "en",
                "is_generated": false,
                "transcript": [{"text": "hi", "start": 0.0, "duration": 1.0}]
            })
        );
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_transcript_uses_default_language() {
        let source = Arc::new(ScriptedSource::with_fetch(vec![Ok(transcript("vid", "en"))]));

        let (status, _) = get_json(router(source.clone()), "/transcript/vid").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(*source.languages_seen.lock(), vec!["en".to_string()]);
    }

    #[tokio::test]
    async fn test_get_transcript_not_found() {
        let source = Arc::new(ScriptedSource::with_fetch(vec![Err(
            SourceError::TranscriptsDisabled {
                video_id: "novid".to_string(),
            },
        )]));

        let (status, body) = get_json(router(source.clone()), "/transcript/novid?language=fr").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["detail"],
            "Subtitles are disabled for this video (novid)"
        );
        assert_eq!(*source.languages_seen.lock(), vec!["fr".to_string()]);
    }

    #[tokio::test]
    async fn test_list_transcripts() {
        let source = Arc::new(ScriptedSource::with_list(vec![Ok(metadata())]));

        let (status, body) = get_json(router(source), "/transcripts/vid").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{
                "language": "English",
                "language_code": "en",
                "is_generated": false,
                "is_translatable": true,
                "translation_languages": [{"language": "German", "language_code": "de"}]
            }])
        );
    }

    #[tokio::test]
    async fn test_list_transcripts_failure_is_404() {
        let source = Arc::new(ScriptedSource::with_list(vec![Err(
            SourceError::VideoUnavailable,
        )]));

        let (status, body) = get_json(router(source), "/transcripts/vid").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "The video is no longer available");
    }
}
