use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::CaptionSegment;

static SPACE_BEFORE_PUNCT_RE: OnceLock<Regex> = OnceLock::new();

fn space_before_punct_re() -> &'static Regex {
    SPACE_BEFORE_PUNCT_RE.get_or_init(|| Regex::new(r"\s+([.,!?])").unwrap())
}

/// A transcript flattened into one paragraph of prose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanTranscript {
    pub text: String,
    pub word_count: usize,
    pub character_count: usize,
}

/// Join segment texts and clean the result
pub fn normalize(segments: &[CaptionSegment]) -> CleanTranscript {
    let mut joined = String::new();
    for segment in segments {
        joined.push_str(&segment.text);
        joined.push(' ');
    }

    let text = normalize_text(&joined);
    let word_count = if text.is_empty() {
        0
    } else {
        text.split(' ').count()
    };
    let character_count = text.chars().count();

    CleanTranscript {
        text,
        word_count,
        character_count,
    }
}

/// Collapse whitespace (newlines included), drop spaces before `.,!?`, and trim
///
/// Idempotent: `normalize_text(&normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");

    space_before_punct_re()
        .replace_all(&collapsed, "$1")
        .trim()
        .to_string()
}
