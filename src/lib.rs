//! YouTube Transcript API - extract captions from YouTube videos through yt-dlp
//!
//! This library wraps the `yt-dlp` command line tool behind the [`TranscriptSource`]
//! trait, parses the WebVTT files it produces into [`CaptionSegment`]s, and serves the
//! result over HTTP or from the command line, either as timed segments or as cleaned prose.

pub mod captions;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod server;
pub mod storage;
pub mod utils;

pub use captions::{CaptionSegment, CleanTranscript};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{
    DownloadedCaptions, SubtitleFormat, TranscriptResult, TranscriptSource, VideoInfo,
    VideoMetadata,
};
pub use storage::ScratchDir;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to transcript extraction
///
/// Internals return [`Result`]; these variants are attached to the `anyhow` chain so the
/// HTTP layer can downcast them and pick a status code.
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("yt-dlp is not installed or not callable. Install it with: pip install yt-dlp")]
    ToolUnavailable,

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("No {lang} captions found for video {video_id}")]
    CaptionsNotFound { video_id: String, lang: String },

    #[error("Failed to parse video metadata: {0}")]
    MetadataParseFailure(String),

    #[error("yt-dlp invocation failed: {0}")]
    ToolInvocationFailure(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
