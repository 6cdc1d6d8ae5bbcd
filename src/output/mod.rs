use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::fetcher::TranscriptPayload;

/// Render the payload as plain transcript text
pub fn format_as_text(payload: &TranscriptPayload) -> String {
    payload.text()
}

/// Render the decoded payload as pretty-printed JSON
pub fn format_as_json(payload: &TranscriptPayload) -> Result<String> {
    Ok(serde_json::to_string_pretty(payload)?)
}

/// Save a fetched transcript to file
pub async fn save_to_file(
    payload: &TranscriptPayload,
    path: &Path,
    format: &OutputFormat,
) -> Result<()> {
    let content = match format {
        OutputFormat::Text => format_as_text(payload),
        OutputFormat::Json => format_as_json(payload)?,
    };

    fs_err::write(path, content)?;
    Ok(())
}

/// Print a fetched transcript to console
pub fn print_to_console(payload: &TranscriptPayload, format: &OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Text => format_as_text(payload),
        OutputFormat::Json => format_as_json(payload)?,
    };

    println!("{}", content);
    Ok(())
}
