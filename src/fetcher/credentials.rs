use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::FetchError;

/// How many times credential issuance is attempted before giving up.
const ISSUE_MAX_ATTEMPTS: u32 = 3;

/// Base delay between issuance attempts; grows linearly per attempt.
const ISSUE_BASE_DELAY: Duration = Duration::from_millis(250);

/// A short-lived bearer credential with an absolute expiry.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Source of raw bearer tokens.
#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self) -> anyhow::Result<String>;
}

/// Clock-derived token source.
///
/// TODO: replace with a call to the provider's real issuance endpoint once
/// one is available; the retry contract around it stays the same.
pub struct TimestampIssuer;

#[async_trait]
impl CredentialIssuer for TimestampIssuer {
    async fn issue(&self) -> anyhow::Result<String> {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Ok(format!("tok_{}_{}", Utc::now().timestamp(), &suffix[..8]))
    }
}

/// Owns the bearer credential used for transcript requests.
///
/// The read-check-refresh sequence runs under an async mutex so concurrent
/// fetches cannot both decide to regenerate and race on the stored value.
/// A credential handed out is never expired at the time of return.
pub struct CredentialManager {
    issuer: Arc<dyn CredentialIssuer>,
    state: Mutex<Option<Credential>>,
    refresh_requested: AtomicBool,
    ttl: Duration,
}

impl CredentialManager {
    pub fn new(ttl: Duration) -> Self {
        Self::with_issuer(Arc::new(TimestampIssuer), ttl)
    }

    pub fn with_issuer(issuer: Arc<dyn CredentialIssuer>, ttl: Duration) -> Self {
        Self {
            issuer,
            state: Mutex::new(None),
            refresh_requested: AtomicBool::new(false),
            ttl,
        }
    }

    /// Return a valid credential, regenerating it first if none is held,
    /// a refresh was forced or requested, or the held one has expired.
    pub async fn valid(&self, force_refresh: bool) -> Result<Credential, FetchError> {
        let force = force_refresh || self.refresh_requested.swap(false, Ordering::SeqCst);

        let mut state = self.state.lock().await;

        if !force {
            if let Some(credential) = state.as_ref() {
                if !credential.is_expired(Utc::now()) {
                    return Ok(credential.clone());
                }
            }
        }

        let fresh = self.generate().await?;
        *state = Some(fresh.clone());
        Ok(fresh)
    }

    /// Request a refresh on the next `valid()` call.
    ///
    /// Deliberately lazy: a caller that just observed an authorization
    /// failure can flag the credential without driving the next attempt's
    /// control flow itself.
    pub fn invalidate(&self) {
        self.refresh_requested.store(true, Ordering::SeqCst);
    }

    /// Issue a new credential, retrying issuance with linearly increasing
    /// delay. Held state is untouched on failure.
    async fn generate(&self) -> Result<Credential, FetchError> {
        let mut last_error = None;

        for attempt in 0..ISSUE_MAX_ATTEMPTS {
            match self.issuer.issue().await {
                Ok(token) => {
                    let expires_at = Utc::now()
                        + chrono::Duration::from_std(self.ttl)
                            .unwrap_or_else(|_| chrono::Duration::hours(1));
                    tracing::debug!(attempt = attempt + 1, "Issued new API credential");
                    return Ok(Credential { token, expires_at });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        "Credential issuance failed: {}",
                        e
                    );
                    last_error = Some(e);
                    if attempt + 1 < ISSUE_MAX_ATTEMPTS {
                        tokio::time::sleep(ISSUE_BASE_DELAY * (attempt + 1)).await;
                    }
                }
            }
        }

        Err(FetchError::CredentialGeneration {
            attempts: ISSUE_MAX_ATTEMPTS,
            cause: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown issuance failure".to_string()),
        })
    }

    #[cfg(test)]
    pub(crate) fn refresh_pending(&self) -> bool {
        self.refresh_requested.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    struct FailingIssuer {
        calls: AtomicU32,
    }

    #[async_trait]
    impl CredentialIssuer for FailingIssuer {
        async fn issue(&self) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("issuance endpoint unavailable")
        }
    }

    fn manager() -> CredentialManager {
        CredentialManager::new(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_valid_returns_same_credential_within_window() {
        let manager = manager();
        let first = manager.valid(false).await.unwrap();
        let second = manager.valid(false).await.unwrap();
        assert_eq!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_valid_refreshes_expired_credential() {
        let manager = manager();
        let first = manager.valid(false).await.unwrap();

        // Backdate the held credential past its expiry
        {
            let mut state = manager.state.lock().await;
            let held = state.as_mut().unwrap();
            held.expires_at = Utc::now() - chrono::Duration::seconds(10);
        }

        let second = manager.valid(false).await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(second.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_credential() {
        let manager = manager();
        let first = manager.valid(false).await.unwrap();
        let second = manager.valid(true).await.unwrap();
        assert_ne!(first.token, second.token);
    }

    #[tokio::test]
    async fn test_invalidate_is_consumed_by_next_valid() {
        let manager = manager();
        let first = manager.valid(false).await.unwrap();

        manager.invalidate();
        assert!(manager.refresh_pending());

        let second = manager.valid(false).await.unwrap();
        assert_ne!(first.token, second.token);
        assert!(!manager.refresh_pending());

        // Flag was consumed; the next call reuses the credential
        let third = manager.valid(false).await.unwrap();
        assert_eq!(second.token, third.token);
    }

    #[tokio::test]
    async fn test_generation_failure_is_bounded_and_surfaced() {
        let issuer = Arc::new(FailingIssuer {
            calls: AtomicU32::new(0),
        });
        let manager =
            CredentialManager::with_issuer(issuer.clone(), Duration::from_secs(3600));

        let err = manager.valid(false).await.unwrap_err();
        match err {
            FetchError::CredentialGeneration { attempts, .. } => {
                assert_eq!(attempts, ISSUE_MAX_ATTEMPTS);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(issuer.calls.load(Ordering::SeqCst), ISSUE_MAX_ATTEMPTS);

        // Failed generation leaves no credential behind
        assert!(manager.state.lock().await.is_none());
    }
}
