use serde::{Deserialize, Serialize};

/// One timed transcript segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start offset in seconds, when the API provides timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,

    /// Segment duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Body of a mapping-shaped response's `transcript` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptBody {
    /// The whole transcript as one string
    Text(String),

    /// Timed segments
    Segments(Vec<TranscriptSegment>),
}

/// Decoded transcript response.
///
/// The upstream API is not consistent about its response shape; the closed
/// set of variants below is resolved once at parse time and carried through
/// unmodified to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptPayload {
    /// `{"transcript": "..."}` or `{"transcript": [{"text": ...}, ...]}`
    Keyed { transcript: TranscriptBody },

    /// `{"data": [{"text": ...}, ...]}`
    Data { data: Vec<TranscriptSegment> },

    /// Bare array of segments
    Segments(Vec<TranscriptSegment>),
}

impl TranscriptPayload {
    /// An empty-but-well-formed response is a definitive empty result, not
    /// a transient condition.
    pub fn is_empty(&self) -> bool {
        match self {
            TranscriptPayload::Keyed {
                transcript: TranscriptBody::Text(text),
            } => text.trim().is_empty(),
            TranscriptPayload::Keyed {
                transcript: TranscriptBody::Segments(segments),
            } => segments.is_empty(),
            TranscriptPayload::Data { data } => data.is_empty(),
            TranscriptPayload::Segments(segments) => segments.is_empty(),
        }
    }

    /// Joined plain-text form of the transcript.
    pub fn text(&self) -> String {
        match self {
            TranscriptPayload::Keyed {
                transcript: TranscriptBody::Text(text),
            } => text.clone(),
            TranscriptPayload::Keyed {
                transcript: TranscriptBody::Segments(segments),
            } => join_segments(segments),
            TranscriptPayload::Data { data } => join_segments(data),
            TranscriptPayload::Segments(segments) => join_segments(segments),
        }
    }
}

fn join_segments(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| segment.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
