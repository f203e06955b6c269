//! Process-local bearer credential cache.
//!
//! Single-flight refresh: the cached credential lives behind a
//! `tokio::sync::Mutex`, so concurrent `acquire()` calls on an expiring
//! credential serialize onto one fetch rather than stampeding the identity
//! provider — the same discipline the donor's `AuthRotator` applies to its
//! key pool, narrowed here to a single cached value instead of a
//! round-robin set.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use vsg_domain::credential::Credential;
use vsg_domain::error::{Error, Result};

/// Seam to the (out-of-scope) cloud identity provider.
#[async_trait]
pub trait CredentialFetcher: Send + Sync {
    async fn fetch(&self) -> Result<Credential>;
}

/// Stands in for the real cloud identity provider in the bundled demo and
/// in tests: returns the same bearer token on every call, with a caller-
/// supplied expiry so refresh-window behavior can still be exercised.
pub struct StaticCredentialFetcher {
    token: String,
    ttl: Duration,
}

impl StaticCredentialFetcher {
    pub fn new(token: impl Into<String>, ttl: Duration) -> Self {
        StaticCredentialFetcher { token: token.into(), ttl }
    }
}

#[async_trait]
impl CredentialFetcher for StaticCredentialFetcher {
    async fn fetch(&self) -> Result<Credential> {
        Ok(Credential::new(self.token.clone(), Utc::now() + self.ttl))
    }
}

#[derive(Debug, Clone)]
pub struct AuthFailureEvent {
    pub error_code: String,
    pub message: String,
    pub session_id: Option<String>,
    pub recoverable: bool,
    pub timestamp: DateTime<Utc>,
}

const DEFAULT_REFRESH_WINDOW_MINUTES: i64 = 5;

pub struct CachedTokenProvider {
    fetcher: Arc<dyn CredentialFetcher>,
    refresh_window: Duration,
    cached: Mutex<Option<Credential>>,
    failures: mpsc::UnboundedSender<AuthFailureEvent>,
}

impl CachedTokenProvider {
    pub fn new(
        fetcher: Arc<dyn CredentialFetcher>,
    ) -> (Self, mpsc::UnboundedReceiver<AuthFailureEvent>) {
        Self::with_refresh_window(fetcher, Duration::minutes(DEFAULT_REFRESH_WINDOW_MINUTES))
    }

    pub fn with_refresh_window(
        fetcher: Arc<dyn CredentialFetcher>,
        refresh_window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<AuthFailureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            CachedTokenProvider {
                fetcher,
                refresh_window,
                cached: Mutex::new(None),
                failures: tx,
            },
            rx,
        )
    }

    /// Returns a valid bearer token, refreshing if the cached one is within
    /// the refresh window of expiry (or absent).
    pub async fn acquire(&self) -> Result<Credential> {
        let mut guard = self.cached.lock().await;
        let stale = match guard.as_ref() {
            Some(cred) => cred.needs_refresh(Utc::now(), self.refresh_window),
            None => true,
        };
        if !stale {
            return Ok(guard.clone().expect("checked Some above"));
        }
        self.fetch_and_cache(&mut guard, None).await
    }

    /// Forces a fetch regardless of the cached credential's remaining
    /// validity.
    pub async fn refresh(&self) -> Result<Credential> {
        let mut guard = self.cached.lock().await;
        self.fetch_and_cache(&mut guard, None).await
    }

    pub async fn authorization_header(&self) -> Result<String> {
        Ok(self.acquire().await?.authorization_header())
    }

    async fn fetch_and_cache(
        &self,
        guard: &mut Option<Credential>,
        session_id: Option<&str>,
    ) -> Result<Credential> {
        match self.fetcher.fetch().await {
            Ok(cred) => {
                *guard = Some(cred.clone());
                Ok(cred)
            }
            Err(err) => {
                tracing::warn!(error = %err, "credential fetch failed");
                let _ = self.failures.send(AuthFailureEvent {
                    error_code: err.wire_code().to_string(),
                    message: err.user_message().to_string(),
                    session_id: session_id.map(str::to_string),
                    recoverable: err.recoverable(),
                    timestamp: Utc::now(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeFetcher {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CredentialFetcher for FakeFetcher {
        async fn fetch(&self) -> Result<Credential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::AuthFailed("invalid client".into()))
            } else {
                Ok(Credential::with_assumed_expiry("tok"))
            }
        }
    }

    #[tokio::test]
    async fn acquire_fetches_once_when_no_cached_credential() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (provider, _rx) = CachedTokenProvider::new(fetcher.clone());
        let cred = provider.acquire().await.unwrap();
        assert_eq!(cred.token, "tok");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn acquire_reuses_cached_credential_outside_refresh_window() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (provider, _rx) = CachedTokenProvider::new(fetcher.clone());
        provider.acquire().await.unwrap();
        provider.acquire().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_always_forces_a_new_fetch() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (provider, _rx) = CachedTokenProvider::new(fetcher.clone());
        provider.acquire().await.unwrap();
        provider.refresh().await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_fetch_emits_auth_failure_event() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let (provider, mut rx) = CachedTokenProvider::new(fetcher);
        assert!(provider.acquire().await.is_err());
        let event = rx.try_recv().unwrap();
        assert_eq!(event.error_code, "AUTH_FAILED");
        assert!(!event.recoverable);
    }

    #[tokio::test]
    async fn authorization_header_uses_bearer_scheme() {
        let fetcher = Arc::new(FakeFetcher {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let (provider, _rx) = CachedTokenProvider::new(fetcher);
        let header = provider.authorization_header().await.unwrap();
        assert_eq!(header, "Bearer tok");
    }
}
