use std::fmt;

use url::Url;

use super::FetchError;

/// Canonical 11-character YouTube video identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(String);

impl VideoId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rewrite the identifier into the short-host URL form the upstream
    /// API expects in its request body.
    pub fn short_url(&self) -> String {
        format!("https://youtu.be/{}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Extract a video identifier from a user-supplied reference.
///
/// Accepts short-host URLs (youtu.be), long-host URLs (youtube.com with a
/// `v` query parameter) and bare 11-character identifiers. Rules are tried
/// in that order; the first match wins.
pub fn extract_video_id(reference: &str) -> Result<VideoId, FetchError> {
    let reference = reference.trim();

    if reference.is_empty() {
        return Err(FetchError::InvalidReference(reference.to_string()));
    }

    // Short-host URLs: the path after the host is the identifier
    if reference.contains("youtu.be") {
        let parsed = parse_lenient(reference)
            .ok_or_else(|| FetchError::InvalidReference(reference.to_string()))?;
        let id = parsed.path().trim_matches('/').to_string();
        if id.is_empty() {
            return Err(FetchError::InvalidReference(reference.to_string()));
        }
        return Ok(VideoId(id));
    }

    // Long-host URLs: the identifier lives in the `v` query parameter
    if reference.contains("youtube.com") {
        if let Some(parsed) = parse_lenient(reference) {
            if let Some((_, value)) = parsed.query_pairs().find(|(key, _)| key == "v") {
                if !value.is_empty() {
                    return Ok(VideoId(value.into_owned()));
                }
            }
        }
        return Err(FetchError::InvalidReference(reference.to_string()));
    }

    // The reference may already be a bare video identifier
    if is_canonical_id(reference) {
        return Ok(VideoId(reference.to_string()));
    }

    Err(FetchError::InvalidReference(reference.to_string()))
}

/// Parse a URL, tolerating a missing scheme (users paste `youtu.be/...`)
fn parse_lenient(reference: &str) -> Option<Url> {
    if reference.contains("://") {
        Url::parse(reference).ok()
    } else {
        Url::parse(&format!("https://{}", reference)).ok()
    }
}

/// Check for the canonical identifier shape: 11 characters drawn from
/// `[A-Za-z0-9_-]`.
fn is_canonical_id(s: &str) -> bool {
    s.len() == 11 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
