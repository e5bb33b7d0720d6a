use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Video ID inside a `watch?v=` or `youtu.be/` URL
const VIDEO_ID_PATTERN: &str = r"(?:youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})";

/// Anchored shape a request URL must have before yt-dlp is ever invoked
const YOUTUBE_URL_PATTERN: &str =
    r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)([a-zA-Z0-9_-]{11})";

static VIDEO_ID_RE: OnceLock<Regex> = OnceLock::new();
static YOUTUBE_URL_RE: OnceLock<Regex> = OnceLock::new();

fn video_id_re() -> &'static Regex {
    VIDEO_ID_RE.get_or_init(|| Regex::new(VIDEO_ID_PATTERN).unwrap())
}

fn youtube_url_re() -> &'static Regex {
    YOUTUBE_URL_RE.get_or_init(|| Regex::new(YOUTUBE_URL_PATTERN).unwrap())
}

/// Extract the 11 character video ID from a YouTube URL
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_re()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Check that a URL looks like a YouTube video URL
pub fn is_youtube_url(url: &str) -> bool {
    youtube_url_re().is_match(url)
}

/// Check that a bare video ID has the shape YouTube uses
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Check that a language code is safe to hand to yt-dlp and to use in file names
pub fn is_valid_language(lang: &str) -> bool {
    !lang.is_empty()
        && lang.len() <= 16
        && lang
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Format a duration in seconds as `MM:SS`, or `HH:MM:SS` from one hour up
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Format a compact `YYYYMMDD` date as `YYYY-MM-DD`
///
/// Anything that is not an 8 character calendar date yields an empty string.
pub fn format_date(compact: &str) -> String {
    if compact.len() != 8 {
        return String::new();
    }

    NaiveDate::parse_from_str(compact, "%Y%m%d")
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Format file size in human-readable format
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let unit_index = (bytes_f.log10() / THRESHOLD.log10()).floor() as usize;
    let unit_index = unit_index.min(UNITS.len() - 1);

    let size = bytes_f / THRESHOLD.powi(unit_index as i32);

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
