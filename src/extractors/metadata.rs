//! Video metadata from yt-dlp's `--dump-json` output.

use serde::{Deserialize, Serialize};

use super::VideoInfo;
use crate::utils::{format_date, format_duration};
use crate::{Result, TranscriptError};

/// Deterministic thumbnail for videos whose metadata came from basic info only
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}

/// Full video metadata as returned to API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel: String,
    pub channel_id: String,
    pub channel_url: String,
    pub duration: u64,
    pub duration_formatted: String,
    pub upload_date: String,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub thumbnail_url: String,
    pub language: Option<String>,
    pub availability: Option<String>,
    pub age_limit: u32,
}

/// The subset of yt-dlp's info dict we read
///
/// Channel fields are not always populated; the `uploader_*` keys are the fallback.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct YtDlpInfo {
    id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    channel_id: Option<String>,
    uploader_id: Option<String>,
    channel_url: Option<String>,
    uploader_url: Option<String>,
    duration: Option<f64>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    comment_count: Option<u64>,
    tags: Option<Vec<String>>,
    categories: Option<Vec<String>>,
    thumbnail: Option<String>,
    language: Option<String>,
    availability: Option<String>,
    age_limit: Option<u32>,
}

impl VideoMetadata {
    /// Map a `--dump-json` document onto [`VideoMetadata`]
    pub fn from_json(video_id: &str, json: &str) -> Result<Self> {
        let info: YtDlpInfo = serde_json::from_str(json)
            .map_err(|e| TranscriptError::MetadataParseFailure(e.to_string()))?;

        let duration = info
            .duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round() as u64)
            .unwrap_or(0);
        let upload_date = info.upload_date.as_deref().map(format_date).unwrap_or_default();

        Ok(Self {
            video_id: info.id.unwrap_or_else(|| video_id.to_string()),
            title: info.title.unwrap_or_default(),
            description: info.description.unwrap_or_default(),
            channel: info.channel.or(info.uploader).unwrap_or_default(),
            channel_id: info.channel_id.or(info.uploader_id).unwrap_or_default(),
            channel_url: info.channel_url.or(info.uploader_url).unwrap_or_default(),
            duration,
            duration_formatted: format_duration(duration),
            upload_date,
            view_count: info.view_count.unwrap_or(0),
            like_count: info.like_count.unwrap_or(0),
            comment_count: info.comment_count.unwrap_or(0),
            tags: info.tags.unwrap_or_default(),
            categories: info.categories.unwrap_or_default(),
            thumbnail_url: info.thumbnail.unwrap_or_else(|| thumbnail_url(video_id)),
            language: info.language,
            availability: info.availability,
            age_limit: info.age_limit.unwrap_or(0),
        })
    }

    /// Reduced metadata synthesized from basic info
    pub fn from_basic(info: &VideoInfo) -> Self {
        let duration = info.duration.trim().parse::<f64>().map(|d| d as u64).unwrap_or(0);

        Self {
            video_id: info.video_id.clone(),
            title: info.title.clone(),
            description: String::new(),
            channel: info.uploader.clone(),
            channel_id: String::new(),
            channel_url: String::new(),
            duration,
            duration_formatted: format_duration(duration),
            upload_date: format_date(&info.upload_date),
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            tags: Vec::new(),
            categories: Vec::new(),
            thumbnail_url: thumbnail_url(&info.video_id),
            language: None,
            availability: None,
            age_limit: 0,
        }
    }
}
