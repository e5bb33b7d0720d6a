//! WebVTT parsing and rendering.
//!
//! The parser is deliberately line oriented rather than a full WebVTT implementation: it
//! only understands cue timings and cue text, which is all yt-dlp auto-captions contain
//! once the `Kind:`/`Language:` preamble is skipped.

use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;

use super::CaptionSegment;

/// Separator between the start and end time of a cue
pub const TIMING_DELIMITER: &str = "-->";

/// First line of every WebVTT document
const HEADER: &str = "WEBVTT";

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

/// Parse a WebVTT document into caption segments, in document order
///
/// A segment opens on a timing line and closes at the end of the document, before a
/// blank line, or before the next timing line. Segments whose text is empty once markup
/// is stripped are dropped. Overlapping or repeated cues are kept as they are.
pub fn parse(content: &str) -> Vec<CaptionSegment> {
    let lines: Vec<&str> = content.lines().collect();
    let mut segments = Vec::new();
    let mut current: Option<CaptionSegment> = None;

    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        if line.contains(TIMING_DELIMITER) {
            current = Some(parse_timing(line));
            continue;
        }

        if line.is_empty() || line.starts_with(HEADER) {
            continue;
        }

        let Some(segment) = current.as_mut() else {
            continue;
        };

        let text = clean_line(line);
        if !text.is_empty() {
            if !segment.text.is_empty() {
                segment.text.push(' ');
            }
            segment.text.push_str(&text);
        }

        let closes = match lines.get(i + 1) {
            None => true,
            Some(next) => next.trim().is_empty() || next.contains(TIMING_DELIMITER),
        };

        if closes {
            if let Some(segment) = current.take() {
                if !segment.text.trim().is_empty() {
                    segments.push(segment);
                }
            }
        }
    }

    segments
}

/// Split a timing line into start and end time, dropping trailing cue settings
fn parse_timing(line: &str) -> CaptionSegment {
    let (start, rest) = line.split_once(TIMING_DELIMITER).unwrap_or((line, ""));
    let end = rest.split_whitespace().next().unwrap_or("");

    CaptionSegment::new(start.trim(), end, "")
}

/// Strip inline markup, decode the common entities and collapse whitespace
fn clean_line(line: &str) -> String {
    let stripped = tag_re().replace_all(line, "");
    let decoded = decode_entities(&stripped);

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render segments as a WebVTT document
///
/// Cue text is escaped so that parsing the document yields the same text again.
pub fn to_vtt(segments: &[CaptionSegment]) -> String {
    let mut out = String::from("WEBVTT\n\n");

    for segment in segments {
        let _ = write!(
            out,
            "{} {} {}\n{}\n\n",
            segment.start_time,
            TIMING_DELIMITER,
            segment.end_time,
            escape_entities(&segment.text)
        );
    }

    out
}

fn escape_entities(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Render segments as a SubRip document
pub fn to_srt(segments: &[CaptionSegment]) -> String {
    let mut out = String::new();

    for (index, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            srt_timestamp(&segment.start_time),
            srt_timestamp(&segment.end_time),
            segment.text
        );
    }

    out
}

/// `00:01.500` or `00:00:01.500` to SubRip's `00:00:01,500`
fn srt_timestamp(timestamp: &str) -> String {
    let full = if timestamp.matches(':').count() == 1 {
        format!("00:{timestamp}")
    } else {
        timestamp.to_string()
    };

    full.replace('.', ",")
}
