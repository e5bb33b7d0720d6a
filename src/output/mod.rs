use anyhow::{Context, Result};
use std::path::Path;

use crate::captions::{normalize, vtt};
use crate::cli::OutputFormat;
use crate::extractors::TranscriptResult;

/// Render a transcript in the requested format
pub fn render(result: &TranscriptResult, format: &OutputFormat) -> Result<String> {
    let content = match format {
        OutputFormat::Text => normalize(&result.segments).text,
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize transcript")?
        }
        OutputFormat::Srt => vtt::to_srt(&result.segments),
        OutputFormat::Vtt => vtt::to_vtt(&result.segments),
    };

    Ok(content)
}

/// Save transcript to file
pub async fn save_to_file(
    result: &TranscriptResult,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = render(result, format)?;

    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(result: &TranscriptResult, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;

    println!("{}", content);
    Ok(())
}
