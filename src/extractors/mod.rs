use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub mod command;
pub mod metadata;
pub mod youtube;

pub use command::{CommandRunner, SystemRunner, ToolOutput};
pub use metadata::VideoMetadata;
pub use youtube::YtDlpGateway;

use crate::captions::CaptionSegment;
use crate::{Result, TranscriptError};

/// Basic video information from yt-dlp's print templates
///
/// Every field is filled; missing values become `Untitled` or `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub video_id: String,
    pub title: String,
    pub duration: String,
    pub uploader: String,
    pub upload_date: String,
    pub url: String,
}

/// Captions extracted and parsed for one video
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub video_id: String,
    pub language: String,
    pub segments: Vec<CaptionSegment>,
    pub total_segments: usize,
    pub raw_content: String,
    pub source: Option<VideoMetadata>,
}

/// A subtitle file left in the scratch directory by a download
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedCaptions {
    pub video_id: String,
    pub language: String,
    pub format: SubtitleFormat,
    pub file_name: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub downloaded_at: DateTime<Utc>,
}

/// Subtitle formats yt-dlp can convert auto-captions to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    #[default]
    Vtt,
    Srt,
    Ass,
    Lrc,
}

impl SubtitleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Ass => "ass",
            SubtitleFormat::Lrc => "lrc",
        }
    }

    /// File extension of the file yt-dlp leaves behind
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether yt-dlp has to convert from the native WebVTT
    pub fn needs_conversion(&self) -> bool {
        !matches!(self, SubtitleFormat::Vtt)
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtitleFormat {
    type Err = TranscriptError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vtt" => Ok(SubtitleFormat::Vtt),
            "srt" => Ok(SubtitleFormat::Srt),
            "ass" => Ok(SubtitleFormat::Ass),
            "lrc" => Ok(SubtitleFormat::Lrc),
            other => Err(TranscriptError::InvalidRequest(format!(
                "Unsupported subtitle format: {other}"
            ))),
        }
    }
}

/// Gateway to a caption extraction backend
///
/// Every operation other than [`check_available`](Self::check_available) re-checks
/// availability first and fails with [`TranscriptError::ToolUnavailable`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Whether the backend can be called at all; errors count as unavailable
    async fn check_available(&self) -> bool;

    /// Title, duration, uploader and upload date of a video
    async fn fetch_basic_info(&self, video_id: &str) -> Result<VideoInfo>;

    /// Full metadata, falling back to a reduced form built from basic info
    async fn fetch_rich_metadata(&self, video_id: &str) -> Result<VideoMetadata>;

    /// Fetch, parse and delete the auto-generated captions of a video
    async fn extract_captions(&self, url: &str, lang: &str) -> Result<TranscriptResult>;

    /// Fetch captions into the scratch directory and leave them there
    async fn download_captions(
        &self,
        url: &str,
        lang: &str,
        format: SubtitleFormat,
    ) -> Result<DownloadedCaptions>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle_format_from_str() {
        assert_eq!("vtt".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Vtt);
        assert_eq!("SRT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert!("docx".parse::<SubtitleFormat>().is_err());
    }

    #[test]
    fn test_subtitle_format_conversion() {
        assert!(!SubtitleFormat::Vtt.needs_conversion());
        assert!(SubtitleFormat::Srt.needs_conversion());
        assert_eq!(SubtitleFormat::default(), SubtitleFormat::Vtt);
    }
}
