//! YouTube transcript source
//!
//! Resolves caption tracks through the InnerTube player endpoint (posing as
//! the Android client) and downloads the timedtext XML of the chosen track.
//! Every request of one call goes through the same proxy.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{SourceError, TranscriptSource};
use crate::models::{
    FetchedTranscript, ProxyCandidate, TranscriptMetadata, TranscriptSnippet, TranslationLanguage,
};

const WATCH_URL: &str = "https://www.youtube.com/watch";
const PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const CLIENT_NAME: &str = "ANDROID";
const CLIENT_VERSION: &str = "20.10.38";
const CONSENT_FORM_ACTION: &str = "action=\"https://consent.youtube.com/s\"";

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid api key regex")
});
static CONSENT_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid consent regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

/// Transcript source backed by youtube.com
pub struct YouTubeTranscriptSource {
    request_timeout: Duration,
}

impl YouTubeTranscriptSource {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    fn client(&self, proxy: Option<&ProxyCandidate>) -> Result<Client, SourceError> {
        let mut builder = Client::builder().timeout(self.request_timeout);
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy.address())?);
        }
        Ok(builder.build()?)
    }

    async fn caption_tracks(
        &self,
        client: &Client,
        video_id: &str,
    ) -> Result<CaptionTracks, SourceError> {
        let html = fetch_watch_html(client, video_id).await?;
        let api_key = extract_api_key(&html)?;
        let player = fetch_player(client, video_id, &api_key).await?;
        parse_caption_tracks(video_id, &player)
    }
}

#[async_trait]
impl TranscriptSource for YouTubeTranscriptSource {
    async fn fetch(
        &self,
        video_id: &str,
        language: &str,
        proxy: Option<&ProxyCandidate>,
    ) -> Result<FetchedTranscript, SourceError> {
        let client = self.client(proxy)?;
        let tracks = self.caption_tracks(&client, video_id).await?;
        let track = tracks.find(language)?;

        debug!(video_id, language = %track.language_code, "Downloading caption track");
        let response = client.get(&track.base_url).send().await?;
        check_blocked(response.status())?;
        let xml = response.error_for_status()?.text().await?;

        Ok(FetchedTranscript {
            video_id: video_id.to_string(),
            language: track.language.clone(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated,
            snippets: parse_timedtext(&xml)?,
        })
    }

    async fn list(
        &self,
        video_id: &str,
        proxy: Option<&ProxyCandidate>,
    ) -> Result<Vec<TranscriptMetadata>, SourceError> {
        let client = self.client(proxy)?;
        Ok(self.caption_tracks(&client, video_id).await?.metadata())
    }
}

fn check_blocked(status: StatusCode) -> Result<(), SourceError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RequestBlocked {
            reason: "Too Many Requests".to_string(),
        });
    }
    Ok(())
}

async fn fetch_watch_html(client: &Client, video_id: &str) -> Result<String, SourceError> {
    let html = get_watch_html(client, video_id, None).await?;
    if !html.contains(CONSENT_FORM_ACTION) {
        return Ok(html);
    }

    let consent = CONSENT_VALUE_RE
        .captures(&html)
        .and_then(|c| c.get(1))
        .map(|m| format!("CONSENT=YES+{}", m.as_str()))
        .ok_or_else(|| SourceError::Other("Failed to read the cookie consent form".to_string()))?;

    let html = get_watch_html(client, video_id, Some(&consent)).await?;
    if html.contains(CONSENT_FORM_ACTION) {
        return Err(SourceError::Other(
            "Failed to automatically give consent to saving cookies".to_string(),
        ));
    }
    Ok(html)
}

async fn get_watch_html(
    client: &Client,
    video_id: &str,
    cookie: Option<&str>,
) -> Result<String, SourceError> {
    let mut request = client
        .get(WATCH_URL)
        .query(&[("v", video_id)])
        .header(ACCEPT_LANGUAGE, "en-US");
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }

    let response = request.send().await?;
    check_blocked(response.status())?;
    let body = response.error_for_status()?.text().await?;
    Ok(html_escape::decode_html_entities(&body).into_owned())
}

async fn fetch_player(client: &Client, video_id: &str, api_key: &str) -> Result<Value, SourceError> {
    let body = json!({
        "context": {
            "client": {
                "clientName": CLIENT_NAME,
                "clientVersion": CLIENT_VERSION,
            }
        },
        "videoId": video_id,
    });

    let response = client
        .post(PLAYER_URL)
        .query(&[("key", api_key)])
        .json(&body)
        .send()
        .await?;
    check_blocked(response.status())?;

    response
        .error_for_status()?
        .json::<Value>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Pull the InnerTube API key out of a watch page
pub fn extract_api_key(html: &str) -> Result<String, SourceError> {
    if let Some(key) = API_KEY_RE.captures(html).and_then(|c| c.get(1)) {
        return Ok(key.as_str().to_string());
    }

    if html.contains("class=\"g-recaptcha\"") {
        return Err(SourceError::RequestBlocked {
            reason: "a captcha was served instead of the video page".to_string(),
        });
    }

    Err(SourceError::Parse(
        "INNERTUBE_API_KEY not found in watch page".to_string(),
    ))
}

#[derive(Debug, Clone)]
struct CaptionTrack {
    base_url: String,
    language: String,
    language_code: String,
    is_generated: bool,
    is_translatable: bool,
}

#[derive(Debug)]
struct CaptionTracks {
    video_id: String,
    manual: Vec<CaptionTrack>,
    generated: Vec<CaptionTrack>,
    translation_languages: Vec<TranslationLanguage>,
}

impl CaptionTracks {
    /// Manually created tracks win over generated ones.
    fn find(&self, language_code: &str) -> Result<&CaptionTrack, SourceError> {
        self.manual
            .iter()
            .chain(self.generated.iter())
            .find(|t| t.language_code == language_code)
            .ok_or_else(|| SourceError::NoTranscriptFound {
                video_id: self.video_id.clone(),
                requested: language_code.to_string(),
                available: self
                    .manual
                    .iter()
                    .chain(self.generated.iter())
                    .map(|t| t.language_code.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn metadata(&self) -> Vec<TranscriptMetadata> {
        self.manual
            .iter()
            .chain(self.generated.iter())
            .map(|t| TranscriptMetadata {
                language: t.language.clone(),
                language_code: t.language_code.clone(),
                is_generated: t.is_generated,
                is_translatable: t.is_translatable,
                translation_languages: if t.is_translatable {
                    self.translation_languages.clone()
                } else {
                    Vec::new()
                },
            })
            .collect()
    }
}

fn display_text(value: &Value) -> String {
    value["simpleText"]
        .as_str()
        .or_else(|| value["runs"][0]["text"].as_str())
        .unwrap_or_default()
        .to_string()
}

fn parse_caption_tracks(video_id: &str, player: &Value) -> Result<CaptionTracks, SourceError> {
    let playability = &player["playabilityStatus"];
    if let Some(status) = playability["status"].as_str() {
        let reason = playability["reason"].as_str().unwrap_or_default();
        match status {
            "OK" => {}
            "LOGIN_REQUIRED" if reason.contains("not a bot") => {
                return Err(SourceError::RequestBlocked {
                    reason: reason.to_string(),
                })
            }
            "ERROR" if reason == "This video is unavailable" => {
                return Err(SourceError::VideoUnavailable)
            }
            _ => {
                return Err(SourceError::Unplayable {
                    reason: reason.to_string(),
                })
            }
        }
    }

    let disabled = || SourceError::TranscriptsDisabled {
        video_id: video_id.to_string(),
    };
    let renderer = &player["captions"]["playerCaptionsTracklistRenderer"];
    let tracks = renderer["captionTracks"].as_array().ok_or_else(disabled)?;

    let translation_languages = renderer["translationLanguages"]
        .as_array()
        .map(|langs| {
            langs
                .iter()
                .map(|l| TranslationLanguage {
                    language: display_text(&l["languageName"]),
                    language_code: l["languageCode"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    let mut manual = Vec::new();
    let mut generated = Vec::new();
    for track in tracks {
        let Some(base_url) = track["baseUrl"].as_str() else {
            continue;
        };
        let caption = CaptionTrack {
            base_url: base_url.replace("&fmt=srv3", ""),
            language: display_text(&track["name"]),
            language_code: track["languageCode"].as_str().unwrap_or_default().to_string(),
            is_generated: track["kind"].as_str() == Some("asr"),
            is_translatable: track["isTranslatable"].as_bool().unwrap_or(false),
        };
        if caption.is_generated {
            generated.push(caption);
        } else {
            manual.push(caption);
        }
    }

    if manual.is_empty() && generated.is_empty() {
        return Err(disabled());
    }

    Ok(CaptionTracks {
        video_id: video_id.to_string(),
        manual,
        generated,
        translation_languages,
    })
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(rename = "text", default)]
    lines: Vec<TimedTextLine>,
}

#[derive(Debug, Deserialize)]
struct TimedTextLine {
    #[serde(rename = "@start")]
    start: f64,
    #[serde(rename = "@dur", default)]
    dur: f64,
    #[serde(rename = "$text", default)]
    text: String,
}

/// Parse a timedtext XML document into snippets, dropping markup.
fn parse_timedtext(xml: &str) -> Result<Vec<TranscriptSnippet>, SourceError> {
    if xml.trim().is_empty() {
        return Err(SourceError::Parse("empty caption document".to_string()));
    }

    let doc: TimedText =
        quick_xml::de::from_str(xml).map_err(|e| SourceError::Parse(e.to_string()))?;

    Ok(doc
        .lines
        .into_iter()
        .filter(|line| !line.text.is_empty())
        .map(|line| {
            let decoded = html_escape::decode_html_entities(&line.text);
            TranscriptSnippet {
                text: TAG_RE.replace_all(&decoded, "").into_owned(),
                start: line.start,
                duration: line.dur,
            }
        })
        .collect())
}
