use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Unified error type for the relay application
#[derive(Error, Debug)]
pub enum RelayError {
    // Transcript errors
    #[error("{0}")]
    TranscriptNotFound(String),

    #[error("{0}")]
    Upstream(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Get the HTTP status code for this error
    ///
    /// Every failure coming out of the retry loop is reported as 404.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::TranscriptNotFound(_) | RelayError::Upstream(_) => StatusCode::NOT_FOUND,

            RelayError::InvalidConfig(_) | RelayError::Io(_) | RelayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "detail": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_code_mapping() {
        assert_eq!(
            RelayError::TranscriptNotFound("none".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::Upstream("boom".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::InvalidConfig("bad".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_message_is_passed_through() {
        let err = RelayError::Upstream("Your IP has been blocked".to_string());
        assert_eq!(err.to_string(), "Your IP has been blocked");
    }

    #[tokio::test]
    async fn test_error_response_uses_detail_body() {
        let response = RelayError::TranscriptNotFound("no captions".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "no captions");
    }
}
