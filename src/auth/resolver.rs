//! Two-tier principal resolution: local verification, then remote fallback.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

use crate::auth::local::{LocalVerifier, LocalVerifyError};
use crate::auth::principal::Principal;
use crate::auth::remote::{RemoteAuthError, RemoteIdentity};
use crate::observability::metrics;

/// Authentication failures surfaced to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no bearer credential supplied")]
    MissingCredential,
    #[error("credential is invalid or expired")]
    InvalidOrExpired,
}

/// Outcome of the ordered verification pipeline, keeping which tier decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Local verification succeeded; the Auth Service was not contacted.
    Local(Principal),
    /// Local verification failed and the Auth Service vouched for the token.
    Remote {
        principal: Principal,
        local_error: LocalVerifyError,
    },
    /// Both tiers refused the token.
    Rejected {
        local_error: LocalVerifyError,
        remote_error: RemoteAuthError,
    },
}

impl Resolution {
    pub fn into_result(self) -> Result<Principal, AuthError> {
        match self {
            Resolution::Local(principal) | Resolution::Remote { principal, .. } => Ok(principal),
            Resolution::Rejected { .. } => Err(AuthError::InvalidOrExpired),
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub struct PrincipalResolver {
    local: LocalVerifier,
    remote: Arc<dyn RemoteIdentity>,
    remote_timeout: Duration,
}

impl PrincipalResolver {
    pub fn new(local: LocalVerifier, remote: Arc<dyn RemoteIdentity>, remote_timeout: Duration) -> Self {
        Self {
            local,
            remote,
            remote_timeout,
        }
    }

    /// Resolve an optional credential into a principal.
    pub async fn resolve(&self, credential: Option<&str>) -> Result<Principal, AuthError> {
        let token = credential.ok_or(AuthError::MissingCredential)?;
        self.verify(token).await.into_result()
    }

    /// Run both tiers in order. The remote call happens only after local
    /// verification has failed, and at most once.
    pub async fn verify(&self, token: &str) -> Resolution {
        let local_error = match self.local.verify(token) {
            Ok(principal) => {
                metrics::record_auth_resolution("local");
                return Resolution::Local(principal);
            }
            Err(e) => e,
        };

        tracing::debug!(reason = %local_error, "Local verification failed, asking auth service");

        let remote = tokio::time::timeout(self.remote_timeout, self.remote.who_am_i(token))
            .await
            .unwrap_or(Err(RemoteAuthError::Timeout));

        match remote {
            Ok(principal) => {
                metrics::record_auth_resolution("remote");
                Resolution::Remote {
                    principal,
                    local_error,
                }
            }
            Err(remote_error) => {
                metrics::record_auth_resolution("rejected");
                tracing::warn!(
                    local_error = %local_error,
                    remote_error = %remote_error,
                    "Token rejected"
                );
                Resolution::Rejected {
                    local_error,
                    remote_error,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and answers with a fixed outcome after an optional delay.
    pub struct StubIdentity {
        pub calls: AtomicUsize,
        pub answer: Result<Principal, RemoteAuthError>,
        pub delay: Duration,
    }

    impl StubIdentity {
        pub fn answering(answer: Result<Principal, RemoteAuthError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                answer,
                delay: Duration::ZERO,
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RemoteIdentity for StubIdentity {
        async fn who_am_i(&self, _token: &str) -> Result<Principal, RemoteAuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone()
        }
    }

    pub fn remote_principal() -> Principal {
        Principal {
            subject_id: 99,
            display_name: "remote-user".into(),
            tenant_id: Some(42),
            profile_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::auth::local::test_tokens;
    use axum::http::HeaderValue;

    fn resolver(remote: Arc<StubIdentity>) -> PrincipalResolver {
        PrincipalResolver::new(
            LocalVerifier::new(test_tokens::SECRET, 0),
            remote,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[tokio::test]
    async fn test_missing_credential_touches_nothing() {
        let remote = StubIdentity::answering(Ok(remote_principal()));
        let result = resolver(remote.clone()).resolve(None).await;

        assert_eq!(result, Err(AuthError::MissingCredential));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_valid_token_never_calls_remote() {
        let remote = StubIdentity::answering(Ok(remote_principal()));
        let resolver = resolver(remote.clone());

        let resolution = resolver.verify(&test_tokens::valid()).await;
        assert!(matches!(resolution, Resolution::Local(ref p) if p.subject_id == 7));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_token_falls_back_once() {
        let remote = StubIdentity::answering(Ok(remote_principal()));
        let resolver = resolver(remote.clone());

        let resolution = resolver.verify(&test_tokens::expired()).await;
        assert_eq!(
            resolution,
            Resolution::Remote {
                principal: remote_principal(),
                local_error: LocalVerifyError::Expired,
            }
        );
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_remote_result_is_authoritative() {
        let remote = StubIdentity::answering(Err(RemoteAuthError::Rejected(401)));
        let resolver = resolver(remote.clone());

        let result = resolver.resolve(Some(&test_tokens::foreign_key())).await;
        assert_eq!(result, Err(AuthError::InvalidOrExpired));
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_timeout_rejects() {
        let remote = Arc::new(StubIdentity {
            calls: Default::default(),
            answer: Ok(remote_principal()),
            delay: Duration::from_secs(30),
        });
        let resolver = resolver(remote.clone());

        let resolution = resolver.verify("garbage").await;
        assert!(matches!(
            resolution,
            Resolution::Rejected {
                remote_error: RemoteAuthError::Timeout,
                ..
            }
        ));
        assert_eq!(remote.calls(), 1);
    }
}
