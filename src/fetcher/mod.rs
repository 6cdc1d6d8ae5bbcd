use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub mod credentials;
pub mod identity;
pub mod reference;
pub mod response;
pub mod transport;

use credentials::CredentialManager;
use identity::IdentityRotator;
use reference::extract_video_id;
use transport::{HttpTransport, TranscriptRequest, TranscriptTransport, TransportResponse};

pub use reference::VideoId;
pub use response::{TranscriptBody, TranscriptPayload, TranscriptSegment};

/// Errors surfaced by the transcript fetcher
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Invalid YouTube URL or video ID: {0}")]
    InvalidReference(String),

    #[error("Failed to generate API credential after {attempts} attempts: {cause}")]
    CredentialGeneration { attempts: u32, cause: String },

    #[error("Transcript service returned an empty transcript for video {video_id}")]
    EmptyResponse { video_id: String },

    #[error("Transcript fetch failed after {attempts} attempts: {cause}")]
    Exhausted { attempts: u32, cause: AttemptFailure },
}

/// The last classified failure observed before retries ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    RateLimited,
    ServerError,
    Transport(String),
    Malformed(String),
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::RateLimited => write!(f, "rate limited by upstream"),
            AttemptFailure::ServerError => write!(f, "upstream server error"),
            AttemptFailure::Transport(cause) => write!(f, "transport failure: {}", cause),
            AttemptFailure::Malformed(cause) => write!(f, "malformed response: {}", cause),
        }
    }
}

/// Classified result of one network attempt.
enum AttemptOutcome {
    Success(TranscriptPayload),
    RateLimited,
    ServerError,
    TransportFailure(String),
    MalformedResponse(String),
}

/// Tunables for the fetcher's retry behavior.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Transcript API endpoint
    pub base_url: String,

    /// Maximum request attempts per fetch
    pub max_attempts: u32,

    /// Base inter-attempt delay; grows linearly with the attempt index
    pub base_delay: Duration,

    /// Fixed delay applied after an HTTP 429
    pub rate_limit_delay: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Validity window of a freshly issued credential
    pub credential_ttl: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: transport::DEFAULT_BASE_URL.to_string(),
            max_attempts: 5,
            base_delay: Duration::from_secs(3),
            rate_limit_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
            credential_ttl: Duration::from_secs(3600),
        }
    }
}

/// Resilient transcript client.
///
/// Resolves a video reference to its canonical identifier, then drives a
/// bounded retry loop against the transcript API with a fresh identity and
/// credential per attempt. Rate limiting and server errors get distinct
/// handling: a 429 only asks us to slow down, while a 500 also rotates the
/// credential since the upstream error taxonomy is not guaranteed.
pub struct TranscriptFetcher {
    config: FetcherConfig,
    transport: Arc<dyn TranscriptTransport>,
    credentials: CredentialManager,
    identities: IdentityRotator,
}

impl TranscriptFetcher {
    /// Create a fetcher speaking to the real transcript API.
    pub fn new(config: FetcherConfig) -> crate::Result<Self> {
        let transport = Arc::new(HttpTransport::new(
            config.base_url.clone(),
            config.request_timeout,
        )?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a fetcher over a custom transport.
    pub fn with_transport(config: FetcherConfig, transport: Arc<dyn TranscriptTransport>) -> Self {
        let credentials = CredentialManager::new(config.credential_ttl);
        Self {
            config,
            transport,
            credentials,
            identities: IdentityRotator::new(),
        }
    }

    /// Fetch the transcript for a video URL or bare video ID.
    ///
    /// Returns either a non-empty payload or one terminal error; transient
    /// failures are retried silently up to the attempt bound and logged as
    /// tracing events.
    pub async fn fetch(&self, reference: &str) -> Result<TranscriptPayload, FetchError> {
        let video_id = extract_video_id(reference)?;
        let video_url = video_id.short_url();

        tracing::info!(video_id = %video_id, "Fetching transcript");

        let max_attempts = self.config.max_attempts.max(1);
        let mut last_failure = AttemptFailure::Transport("no attempt completed".to_string());

        for attempt in 0..max_attempts {
            let identity = self.identities.next();
            // Every retry after the first forces a fresh credential, on the
            // assumption that the prior failure may have been auth-related.
            let credential = self.credentials.valid(attempt > 0).await?;

            let request = TranscriptRequest {
                video_url: video_url.clone(),
                identity: identity.to_string(),
                bearer_token: credential.token,
            };

            let outcome = match self.transport.execute(&request).await {
                Ok(response) => classify(response),
                Err(e) => AttemptOutcome::TransportFailure(e.to_string()),
            };

            let is_last = attempt + 1 == max_attempts;

            match outcome {
                AttemptOutcome::Success(payload) => {
                    if payload.is_empty() {
                        // A well-formed empty response is definitive
                        return Err(FetchError::EmptyResponse {
                            video_id: video_id.to_string(),
                        });
                    }
                    tracing::info!(
                        video_id = %video_id,
                        attempts = attempt + 1,
                        "Transcript fetched"
                    );
                    return Ok(payload);
                }
                AttemptOutcome::RateLimited => {
                    last_failure = AttemptFailure::RateLimited;
                    if is_last {
                        break;
                    }
                    self.log_retry(attempt, &last_failure, self.config.rate_limit_delay);
                    tokio::time::sleep(self.config.rate_limit_delay).await;
                }
                AttemptOutcome::ServerError => {
                    self.credentials.invalidate();
                    last_failure = AttemptFailure::ServerError;
                    if is_last {
                        break;
                    }
                    let delay = self.backoff(attempt);
                    self.log_retry(attempt, &last_failure, delay);
                    tokio::time::sleep(delay).await;
                }
                AttemptOutcome::TransportFailure(cause) => {
                    last_failure = AttemptFailure::Transport(cause);
                    if is_last {
                        break;
                    }
                    let delay = self.backoff(attempt);
                    self.log_retry(attempt, &last_failure, delay);
                    tokio::time::sleep(delay).await;
                }
                AttemptOutcome::MalformedResponse(cause) => {
                    last_failure = AttemptFailure::Malformed(cause);
                    if is_last {
                        break;
                    }
                    let delay = self.backoff(attempt);
                    self.log_retry(attempt, &last_failure, delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: max_attempts,
            cause: last_failure,
        })
    }

    /// Flag the current credential for regeneration on the next attempt.
    pub fn invalidate_credential(&self) {
        self.credentials.invalidate();
    }

    /// Linear backoff keeps the worst-case latency bounded for the small
    /// fixed attempt count while still spacing out retries.
    fn backoff(&self, attempt: u32) -> Duration {
        self.config.base_delay * (attempt + 1)
    }

    fn log_retry(&self, attempt: u32, failure: &AttemptFailure, delay: Duration) {
        tracing::warn!(
            attempt = attempt + 1,
            max_attempts = self.config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Transcript request failed, will retry: {}",
            failure
        );
    }
}

/// Classify an HTTP-level response into an attempt outcome.
fn classify(response: TransportResponse) -> AttemptOutcome {
    match response.status {
        429 => AttemptOutcome::RateLimited,
        500 => AttemptOutcome::ServerError,
        status if (200..300).contains(&status) => {
            match serde_json::from_str::<TranscriptPayload>(&response.body) {
                Ok(payload) => AttemptOutcome::Success(payload),
                Err(e) => AttemptOutcome::MalformedResponse(e.to_string()),
            }
        }
        status => AttemptOutcome::TransportFailure(format!("unexpected HTTP status {}", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::transport::TransportError;
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// One scripted transport reply.
    enum Reply {
        Http(u16, &'static str),
        ConnectionError,
    }

    /// Stub transport that replays a script and counts calls. The last
    /// script entry repeats once the script is exhausted.
    struct ScriptedTransport {
        script: Vec<Reply>,
        calls: AtomicU32,
        bearer_tokens: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                script,
                calls: AtomicU32::new(0),
                bearer_tokens: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptTransport for ScriptedTransport {
        async fn execute(
            &self,
            request: &TranscriptRequest,
        ) -> Result<TransportResponse, TransportError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.bearer_tokens
                .lock()
                .unwrap()
                .push(request.bearer_token.clone());

            let reply = self
                .script
                .get(index)
                .or_else(|| self.script.last())
                .expect("script must be non-empty");

            match reply {
                Reply::Http(status, body) => Ok(TransportResponse {
                    status: *status,
                    body: body.to_string(),
                }),
                Reply::ConnectionError => Err(TransportError("connection refused".to_string())),
            }
        }
    }

    const OK_BODY: &str = r#"{"transcript": "hello from the test transcript"}"#;

    fn fast_config() -> FetcherConfig {
        FetcherConfig {
            base_delay: Duration::from_millis(1),
            rate_limit_delay: Duration::from_millis(1),
            ..FetcherConfig::default()
        }
    }

    fn fetcher(transport: Arc<ScriptedTransport>) -> TranscriptFetcher {
        TranscriptFetcher::with_transport(fast_config(), transport)
    }

    #[tokio::test]
    async fn test_invalid_reference_makes_no_network_call() {
        let transport = ScriptedTransport::new(vec![Reply::Http(200, OK_BODY)]);
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch("not a reference").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidReference(_)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = ScriptedTransport::new(vec![Reply::Http(200, OK_BODY)]);
        let fetcher = fetcher(transport.clone());

        let payload = fetcher.fetch("dQw4w9WgXcQ").await.unwrap();
        assert_eq!(payload.text(), "hello from the test transcript");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_then_success() {
        let transport = ScriptedTransport::new(vec![
            Reply::Http(429, ""),
            Reply::Http(429, ""),
            Reply::Http(200, OK_BODY),
        ]);
        let fetcher = fetcher(transport.clone());

        let payload = fetcher.fetch("dQw4w9WgXcQ").await.unwrap();
        assert!(!payload.is_empty());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_persistent_server_error_exhausts_and_invalidates() {
        let transport = ScriptedTransport::new(vec![Reply::Http(500, "internal error")]);
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch("dQw4w9WgXcQ").await.unwrap_err();
        match err {
            FetchError::Exhausted { attempts, cause } => {
                assert_eq!(attempts, 5);
                assert_eq!(cause, AttemptFailure::ServerError);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 5);

        // The 500 on the final attempt left a refresh request pending
        assert!(fetcher.credentials.refresh_pending());

        // Forced refreshes mean every retry carried a distinct credential
        let tokens = transport.bearer_tokens.lock().unwrap();
        let distinct: HashSet<_> = tokens.iter().collect();
        assert_eq!(distinct.len(), tokens.len());
    }

    #[tokio::test]
    async fn test_empty_response_is_terminal_without_retry() {
        let transport = ScriptedTransport::new(vec![Reply::Http(200, r#"{"transcript": ""}"#)]);
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch("dQw4w9WgXcQ").await.unwrap_err();
        match err {
            FetchError::EmptyResponse { video_id } => assert_eq!(video_id, "dQw4w9WgXcQ"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_exhausts_with_cause() {
        let transport = ScriptedTransport::new(vec![Reply::Http(200, "<html>not json</html>")]);
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch("dQw4w9WgXcQ").await.unwrap_err();
        match err {
            FetchError::Exhausted { attempts, cause } => {
                assert_eq!(attempts, 5);
                assert!(matches!(cause, AttemptFailure::Malformed(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn test_connection_error_then_success() {
        let transport = ScriptedTransport::new(vec![
            Reply::ConnectionError,
            Reply::Http(200, OK_BODY),
        ]);
        let fetcher = fetcher(transport.clone());

        let payload = fetcher.fetch("https://youtu.be/dQw4w9WgXcQ").await.unwrap();
        assert!(!payload.is_empty());
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_unexpected_status_is_retried_as_transport_failure() {
        let transport = ScriptedTransport::new(vec![Reply::Http(404, "not found")]);
        let fetcher = fetcher(transport.clone());

        let err = fetcher.fetch("dQw4w9WgXcQ").await.unwrap_err();
        match err {
            FetchError::Exhausted { cause, .. } => {
                assert_eq!(
                    cause,
                    AttemptFailure::Transport("unexpected HTTP status 404".to_string())
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.calls(), 5);
    }

    #[tokio::test]
    async fn test_request_carries_short_url_form() {
        struct CapturingTransport {
            seen: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl TranscriptTransport for CapturingTransport {
            async fn execute(
                &self,
                request: &TranscriptRequest,
            ) -> Result<TransportResponse, TransportError> {
                self.seen.lock().unwrap().push(request.video_url.clone());
                Ok(TransportResponse {
                    status: 200,
                    body: OK_BODY.to_string(),
                })
            }
        }

        let transport = Arc::new(CapturingTransport {
            seen: Mutex::new(Vec::new()),
        });
        let fetcher = TranscriptFetcher::with_transport(fast_config(), transport.clone());

        fetcher
            .fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
            .await
            .unwrap();

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["https://youtu.be/dQw4w9WgXcQ"]);
    }
}
