//! Timed caption handling: WebVTT parsing and transcript cleaning.

use serde::{Deserialize, Serialize};

pub mod clean;
pub mod vtt;

pub use clean::{normalize, normalize_text, CleanTranscript};

/// One parsed cue block
///
/// Timestamps are kept exactly as they appear in the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSegment {
    pub start_time: String,
    pub end_time: String,
    pub text: String,
}

impl CaptionSegment {
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            text: text.into(),
        }
    }
}
