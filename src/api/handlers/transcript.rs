//! Transcript handlers

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::api::server::AppState;
use crate::error::RelayError;
use crate::models::TranscriptResponse;

/// Query parameters for fetching a transcript
#[derive(Debug, Deserialize, Default)]
pub struct TranscriptQuery {
    pub language: Option<String>,
}

/// Fetch the transcript of a video
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
    Query(query): Query<TranscriptQuery>,
) -> Result<impl IntoResponse, RelayError> {
    let language = query
        .language
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| state.default_language.to_string());

    let transcript = state.fetcher.fetch(&video_id, &language).await?;
    Ok(Json(TranscriptResponse::from(transcript)))
}

/// List the transcripts available for a video
pub async fn list_transcripts(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<impl IntoResponse, RelayError> {
    let transcripts = state.fetcher.list(&video_id).await?;
    Ok(Json(transcripts))
}
