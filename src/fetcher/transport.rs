use std::time::Duration;

use async_trait::async_trait;
use reqwest::header;
use serde::Serialize;

/// Default transcript endpoint.
pub const DEFAULT_BASE_URL: &str = "https://kome.ai/api/transcript";

/// Origin/referer pair matching the provider's own web tool.
const PROVIDER_ORIGIN: &str = "https://kome.ai";
const PROVIDER_REFERER: &str = "https://kome.ai/tools/youtube-transcript-generator";

/// One outbound transcript request.
#[derive(Debug, Clone)]
pub struct TranscriptRequest {
    /// Short-host URL form embedding the canonical video identifier
    pub video_url: String,

    /// Rotated client-identity string for this attempt
    pub identity: String,

    /// Bearer credential for this attempt
    pub bearer_token: String,
}

/// Raw result of one transport attempt, before classification.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Transport-level failure: connection error, timeout, or a body that
/// could not be read.
#[derive(thiserror::Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Seam between the retry loop and the wire. Stub implementations back
/// the retry-loop tests.
#[async_trait]
pub trait TranscriptTransport: Send + Sync {
    async fn execute(&self, request: &TranscriptRequest) -> Result<TransportResponse, TransportError>;
}

#[derive(Serialize)]
struct RequestBody<'a> {
    video_id: &'a str,
    // The upstream API expects the literal string "true", not a boolean
    format: &'a str,
}

/// HTTPS transport speaking to the real transcript API.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            header::HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(header::ORIGIN, header::HeaderValue::from_static(PROVIDER_ORIGIN));
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_static(PROVIDER_REFERER),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl TranscriptTransport for HttpTransport {
    async fn execute(&self, request: &TranscriptRequest) -> Result<TransportResponse, TransportError> {
        let body = RequestBody {
            video_id: &request.video_url,
            format: "true",
        };

        let response = self
            .client
            .post(&self.base_url)
            .header(header::USER_AGENT, &request.identity)
            .bearer_auth(&request.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("failed to read response body: {}", e)))?;

        Ok(TransportResponse { status, body })
    }
}
