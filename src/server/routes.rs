//! Handlers for the transcript API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::captions::{normalize, CaptionSegment};
use crate::extractors::{DownloadedCaptions, SubtitleFormat, VideoInfo, VideoMetadata};
use crate::utils::{is_valid_language, is_valid_video_id, is_youtube_url};

/// Placeholder list served until language discovery goes through yt-dlp `--list-subs`
const AVAILABLE_LANGUAGES: [&str; 6] = ["es", "en", "fr", "de", "it", "pt"];

/// Body of `/extract`, `/download` and `/clean`
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptRequest {
    pub url: Option<String>,
    pub lang: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub success: bool,
    pub url: String,
    pub language: String,
    pub transcript: Vec<CaptionSegment>,
    pub source: Option<VideoMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub success: bool,
    pub url: String,
    #[serde(flatten)]
    pub download: DownloadedCaptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResponse {
    pub success: bool,
    pub video_url: String,
    pub video_id: String,
    pub language: String,
    pub cleaned_transcript: String,
    pub word_count: usize,
    pub character_count: usize,
    pub total_segments: usize,
    pub source: Option<VideoMetadata>,
}

/// A request that passed validation and may reach yt-dlp
struct ValidRequest {
    url: String,
    lang: String,
}

fn validate(state: &AppState, request: &TranscriptRequest) -> Result<ValidRequest, ApiError> {
    let url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::bad_request("Video URL is required", "The 'url' field is missing"))?;

    if !is_youtube_url(url) {
        return Err(ApiError::bad_request(
            "Invalid YouTube URL",
            format!("'{url}' is not a youtube.com/watch?v= or youtu.be/ URL"),
        ));
    }

    let lang = request
        .lang
        .clone()
        .unwrap_or_else(|| state.default_language.to_string());
    if !is_valid_language(&lang) {
        return Err(ApiError::bad_request(
            "Invalid language code",
            format!("'{lang}' is not a valid language code"),
        ));
    }

    Ok(ValidRequest {
        url: url.to_string(),
        lang,
    })
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "message": "YouTube Transcript API is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// GET /api/transcript/info/{video_id}
pub async fn video_info(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoInfo>, ApiError> {
    if !is_valid_video_id(&video_id) {
        return Err(ApiError::bad_request(
            "Invalid video ID",
            format!("'{video_id}' is not an 11 character YouTube video ID"),
        ));
    }

    let info = state
        .source
        .fetch_basic_info(&video_id)
        .await
        .map_err(|e| ApiError::from_error("Error fetching video information", e))?;

    Ok(Json(info))
}

/// POST /api/transcript/extract
pub async fn extract(
    State(state): State<AppState>,
    body: Result<Json<TranscriptRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(request) = body?;
    let ValidRequest { url, lang } = validate(&state, &request)?;

    let result = state
        .source
        .extract_captions(&url, &lang)
        .await
        .map_err(|e| ApiError::from_error("Error extracting transcript", e))?;

    Ok(Json(ExtractResponse {
        success: true,
        url,
        language: lang,
        transcript: result.segments,
        source: result.source,
    }))
}

/// POST /api/transcript/download
pub async fn download(
    State(state): State<AppState>,
    body: Result<Json<TranscriptRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ApiError> {
    let Json(request) = body?;
    let ValidRequest { url, lang } = validate(&state, &request)?;

    let format = match request.format.as_deref() {
        Some(name) => name
            .parse::<SubtitleFormat>()
            .map_err(|e| ApiError::bad_request("Invalid subtitle format", e.to_string()))?,
        None => SubtitleFormat::default(),
    };

    let download = state
        .source
        .download_captions(&url, &lang, format)
        .await
        .map_err(|e| ApiError::from_error("Error downloading subtitles", e))?;

    Ok(Json(DownloadResponse {
        success: true,
        url,
        download,
    }))
}

/// POST /api/transcript/clean
///
/// Returns `success: false` with status 200 when the video has no captions in the language.
pub async fn clean(
    State(state): State<AppState>,
    body: Result<Json<TranscriptRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::from(e).with_video_url("Unknown"))?;
    let video_url = request.url.clone().unwrap_or_else(|| "Unknown".to_string());
    let ValidRequest { url, lang } =
        validate(&state, &request).map_err(|e| e.with_video_url(video_url.clone()))?;

    let result = state
        .source
        .extract_captions(&url, &lang)
        .await
        .map_err(|e| {
            ApiError::from_error("Error extracting transcript", e).with_video_url(video_url.clone())
        })?;

    if result.segments.is_empty() {
        return Ok(Json(json!({
            "success": false,
            "message": "No transcript available for this video",
            "videoUrl": url,
        }))
        .into_response());
    }

    let cleaned = normalize(&result.segments);
    let response = CleanResponse {
        success: true,
        video_url: url,
        video_id: result.video_id,
        language: lang,
        cleaned_transcript: cleaned.text,
        word_count: cleaned.word_count,
        character_count: cleaned.character_count,
        total_segments: result.total_segments,
        source: result.source,
    };

    Ok(Json(response).into_response())
}

/// GET /api/transcript/languages/{video_id}
pub async fn languages(Path(video_id): Path<String>) -> Json<Value> {
    Json(json!({
        "message": "Language discovery is not implemented yet",
        "videoId": video_id,
        "availableLanguages": AVAILABLE_LANGUAGES,
    }))
}

/// Any unmatched route
pub async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "path": uri.path(),
        })),
    )
}
