use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::extractors::SubtitleFormat;

#[derive(Parser)]
#[command(
    name = "transcript-api",
    about = "YouTube Transcript API - extract captions from YouTube videos with yt-dlp",
    version,
    long_about = "Serves an HTTP API that extracts auto-generated YouTube captions through yt-dlp and returns them as timed segments or cleaned text. The same operations are available as one-shot commands."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(short, long, global = true, env = "TRANSCRIPT_API_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
    },

    /// Extract the transcript of a video
    Extract {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        lang: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Download the caption file of a video into the scratch directory
    Download {
        /// YouTube video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Caption language (defaults to the configured language)
        #[arg(short, long, value_name = "LANG")]
        lang: Option<String>,

        /// Subtitle file format
        #[arg(short, long, value_enum, default_value = "vtt")]
        format: SubtitleFormat,
    },

    /// Show information about a video
    Info {
        /// 11 character YouTube video ID
        #[arg(value_name = "VIDEO_ID")]
        video_id: String,

        /// Fetch full metadata instead of basic info
        #[arg(long)]
        rich: bool,
    },

    /// Remove stale files from the scratch directory
    Cleanup {
        /// Remove entries older than this many hours (defaults to the configured age)
        #[arg(long, value_name = "HOURS")]
        max_age_hours: Option<u64>,

        /// Scratch directory to sweep (defaults to the configured directory)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Check that yt-dlp is installed and callable
    Check,

    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Cleaned plain text
    Text,
    /// JSON with timed segments and metadata
    Json,
    /// SRT subtitle format
    Srt,
    /// WebVTT format
    Vtt,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Srt => write!(f, "srt"),
            OutputFormat::Vtt => write!(f, "vtt"),
        }
    }
}
