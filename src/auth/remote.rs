//! Remote verification against the Auth Service's "who am I" endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::auth::principal::{numeric_id, optional_numeric_id, Principal};

/// Failure of a remote identity lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteAuthError {
    #[error("auth service unreachable: {0}")]
    Unreachable(String),
    #[error("auth service timed out")]
    Timeout,
    #[error("auth service rejected the token with status {0}")]
    Rejected(u16),
    #[error("unexpected auth service response: {0}")]
    InvalidResponse(String),
}

/// Something that can turn a raw bearer token into a principal remotely.
#[async_trait]
pub trait RemoteIdentity: Send + Sync {
    async fn who_am_i(&self, token: &str) -> Result<Principal, RemoteAuthError>;
}

/// Body of `GET /api/auth/me`.
#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(alias = "sub", deserialize_with = "numeric_id")]
    usuario_id: i64,
    #[serde(default)]
    usuario: Option<String>,
    #[serde(default, deserialize_with = "optional_numeric_id")]
    cliente_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_numeric_id")]
    perfil_id: Option<i64>,
}

impl From<MeResponse> for Principal {
    fn from(me: MeResponse) -> Self {
        Principal {
            subject_id: me.usuario_id,
            display_name: me.usuario.unwrap_or_else(|| "unknown".to_string()),
            tenant_id: me.cliente_id,
            profile_id: me.perfil_id,
        }
    }
}

/// HTTP client for the Auth Service.
pub struct HttpAuthService {
    client: reqwest::Client,
    me_url: String,
}

impl HttpAuthService {
    /// `base_url` is the Auth Service root, e.g. `http://localhost:8000`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            me_url: format!("{}/api/auth/me", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl RemoteIdentity for HttpAuthService {
    async fn who_am_i(&self, token: &str) -> Result<Principal, RemoteAuthError> {
        let response = self
            .client
            .get(&self.me_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteAuthError::Rejected(status.as_u16()));
        }

        let me: MeResponse = response
            .json()
            .await
            .map_err(|e| RemoteAuthError::InvalidResponse(e.to_string()))?;
        Ok(me.into())
    }
}

fn classify(err: reqwest::Error) -> RemoteAuthError {
    if err.is_timeout() {
        RemoteAuthError::Timeout
    } else {
        RemoteAuthError::Unreachable(err.to_string())
    }
}
