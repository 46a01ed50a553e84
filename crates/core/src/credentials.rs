//! Per-bank access token lifecycle.
//!
//! A [`CredentialCache`] holds at most one token. Concurrent callers wait on the same mutex while
//! a refresh is in flight, so a burst of requests issues a single token request.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::proposal::BankName;
use crate::errors::BankError;
use crate::ports::{AccessToken, AuthPort};

pub struct CachedToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct CredentialCache {
    bank: BankName,
    auth: Arc<dyn AuthPort>,
    safety_margin: Duration,
    state: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new(auth: Arc<dyn AuthPort>, safety_margin: Duration) -> Self {
        Self { bank: auth.bank().clone(), auth, safety_margin, state: Mutex::new(None) }
    }

    pub fn bank(&self) -> &BankName {
        &self.bank
    }

    /// Returns the cached token while it is fresh, otherwise requests a new one.
    pub async fn get_token(&self) -> Result<AccessToken, BankError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();

        if let Some(cached) = state.as_ref().filter(|cached| cached.is_fresh(now)) {
            return Ok(AccessToken::from_secret(cached.value.clone()));
        }

        let issued = match self.auth.request_token().await {
            Ok(issued) => issued,
            Err(error) => {
                warn!(
                    event_name = "credentials.token.request_failed",
                    bank = %self.bank,
                    error_class = error.error_class(),
                    "token request failed"
                );
                *state = None;
                return Err(error);
            }
        };

        let lifetime = issued.ttl.saturating_sub(self.safety_margin);
        let expires_at = now
            + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::zero());
        info!(
            event_name = "credentials.token.refreshed",
            bank = %self.bank,
            expires_at = %expires_at,
            "access token refreshed"
        );

        let token = AccessToken::from_secret(issued.value.clone());
        *state = Some(CachedToken { value: issued.value, expires_at });
        Ok(token)
    }

    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    /// Drops the cached token only if it is still the one that failed; a token refreshed by
    /// another caller in the meantime is kept.
    pub async fn invalidate_if_current(&self, failed: &AccessToken) {
        let mut state = self.state.lock().await;
        let is_current = state
            .as_ref()
            .is_some_and(|cached| cached.value.expose_secret() == failed.expose());
        if is_current {
            *state = None;
        }
    }

    pub async fn has_cached_token(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Runs `operation` with a token. An `Unauthorized` answer invalidates the token and the
    /// operation is retried exactly once with a fresh one; every other error is returned as is.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, BankError>
    where
        F: FnMut(AccessToken) -> Fut,
        Fut: Future<Output = Result<T, BankError>>,
    {
        let token = self.get_token().await?;
        match operation(token.clone()).await {
            Err(error) if error.is_unauthorized() => {
                debug!(
                    event_name = "credentials.token.retry",
                    bank = %self.bank,
                    "bank rejected the token; retrying once with a fresh token"
                );
                self.invalidate_if_current(&token).await;
                let fresh = self.get_token().await?;
                operation(fresh).await
            }
            outcome => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::CredentialCache;
    use crate::errors::BankError;
    use crate::test_support::ScriptedAuth;

    #[tokio::test]
    async fn cached_token_is_reused_until_expiry() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(3600)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));

        let first = cache.get_token().await.expect("token");
        let second = cache.get_token().await.expect("token");

        assert_eq!(first, second);
        assert_eq!(auth.requests(), 1);
    }

    #[tokio::test]
    async fn ttl_within_safety_margin_forces_a_refresh_every_time() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(30)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));

        let first = cache.get_token().await.expect("token");
        let second = cache.get_token().await.expect("token");

        assert_ne!(first, second);
        assert_eq!(auth.requests(), 2);
    }

    #[tokio::test]
    async fn unauthorized_is_retried_exactly_once_with_a_fresh_token() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(3600)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));
        let mut seen = Vec::new();

        let outcome = cache
            .execute(|token| {
                seen.push(token.expose().to_string());
                let attempt = seen.len();
                async move {
                    if attempt == 1 {
                        Err(BankError::Unauthorized)
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(outcome, Ok(2));
        assert_eq!(auth.requests(), 2);
        assert_ne!(seen[0], seen[1]);
    }

    #[tokio::test]
    async fn second_unauthorized_is_terminal() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(3600)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));
        let mut attempts = 0;

        let outcome: Result<(), BankError> = cache
            .execute(|_| {
                attempts += 1;
                async { Err(BankError::Unauthorized) }
            })
            .await;

        assert_eq!(outcome, Err(BankError::Unauthorized));
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(3600)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));

        for error in [
            BankError::Forbidden,
            BankError::RateLimited,
            BankError::Server { status: 503, message: "down".to_string() },
        ] {
            let mut attempts = 0;
            let expected = error.clone();
            let outcome: Result<(), BankError> = cache
                .execute(|_| {
                    attempts += 1;
                    let error = error.clone();
                    async move { Err(error) }
                })
                .await;

            assert_eq!(outcome, Err(expected));
            assert_eq!(attempts, 1);
        }
        assert_eq!(auth.requests(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let auth = Arc::new(
            ScriptedAuth::new("itau", Duration::from_secs(3600))
                .with_latency(Duration::from_millis(20)),
        );
        let cache = Arc::new(CredentialCache::new(auth.clone(), Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_token().await })
            })
            .collect();
        for handle in handles {
            handle.await.expect("join").expect("token");
        }

        assert_eq!(auth.requests(), 1);
    }

    #[tokio::test]
    async fn failed_token_request_leaves_cache_empty() {
        let auth = Arc::new(ScriptedAuth::failing("itau", BankError::Forbidden));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));

        assert_eq!(cache.get_token().await, Err(BankError::Forbidden));
        assert!(!cache.has_cached_token().await);
    }

    #[tokio::test]
    async fn stale_invalidation_keeps_a_newer_token() {
        let auth = Arc::new(ScriptedAuth::new("itau", Duration::from_secs(3600)));
        let cache = CredentialCache::new(auth.clone(), Duration::from_secs(60));

        let old = cache.get_token().await.expect("token");
        cache.invalidate().await;
        let fresh = cache.get_token().await.expect("token");
        cache.invalidate_if_current(&old).await;

        assert_eq!(cache.get_token().await.expect("token"), fresh);
        assert_eq!(auth.requests(), 2);
    }
}
