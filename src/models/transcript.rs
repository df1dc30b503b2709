use serde::{Deserialize, Serialize};

/// One caption line with its timing, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// A transcript retrieved for a single video and language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedTranscript {
    pub video_id: String,
    /// Human readable language name, e.g. "English (auto-generated)"
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub snippets: Vec<TranscriptSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLanguage {
    pub language: String,
    pub language_code: String,
}

/// Describes one transcript track available for a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub is_translatable: bool,
    pub translation_languages: Vec<TranslationLanguage>,
}

/// Response body for `GET /transcript/{video_id}`
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptResponse {
    pub video_id: String,
    pub language: String,
    pub language_code: String,
    pub is_generated: bool,
    pub transcript: Vec<TranscriptSnippet>,
}

impl From<FetchedTranscript> for TranscriptResponse {
    fn from(fetched: FetchedTranscript) -> Self {
        Self {
            video_id: fetched.video_id,
            language: fetched.language,
            language_code: fetched.language_code,
            is_generated: fetched.is_generated,
            transcript: fetched.snippets,
        }
    }
}
