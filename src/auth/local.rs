//! Offline token verification with the shared secret.
//!
//! Pure computation over the token bytes: no I/O and no suspension points.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::principal::{numeric_id, optional_numeric_id, Principal};

/// Why a token could not be verified locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalVerifyError {
    #[error("token expired")]
    Expired,
    #[error("signature does not match")]
    BadSignature,
    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for LocalVerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => LocalVerifyError::Expired,
            ErrorKind::InvalidSignature => LocalVerifyError::BadSignature,
            _ => LocalVerifyError::Malformed(err.to_string()),
        }
    }
}

/// Claims issued by the Auth Service.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(deserialize_with = "numeric_id")]
    sub: i64,
    #[serde(default)]
    usuario: Option<String>,
    #[serde(default, deserialize_with = "optional_numeric_id")]
    cliente_id: Option<i64>,
    #[serde(default, deserialize_with = "optional_numeric_id")]
    perfil_id: Option<i64>,
}

/// HS256 verifier keyed with the gateway's shared secret.
pub struct LocalVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl LocalVerifier {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_aud = false;
        // `sub` is checked by `TokenClaims`; the Auth Service issues it as a number.
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Verify signature and expiry, then decode the claims into a principal.
    pub fn verify(&self, token: &str) -> Result<Principal, LocalVerifyError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation)?;
        let claims = data.claims;

        Ok(Principal {
            subject_id: claims.sub,
            display_name: claims.usuario.unwrap_or_else(|| "unknown".to_string()),
            tenant_id: claims.cliente_id,
            profile_id: claims.perfil_id,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_tokens::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_token_decodes_claims() {
        let verifier = LocalVerifier::new(SECRET, 0);
        let principal = verifier.verify(&valid()).unwrap();

        assert_eq!(
            principal,
            Principal {
                subject_id: 7,
                display_name: "ana".into(),
                tenant_id: Some(42),
                profile_id: Some(3),
            }
        );
    }

    #[test]
    fn test_string_subject_and_missing_tenant() {
        let token = sign(
            SECRET,
            json!({ "sub": "15", "usuario": "root", "exp": chrono::Utc::now().timestamp() + 60 }),
        );
        let principal = LocalVerifier::new(SECRET, 0).verify(&token).unwrap();
        assert_eq!(principal.subject_id, 15);
        assert_eq!(principal.tenant_id, None);
        assert_eq!(principal.profile_id, None);
    }

    #[test]
    fn test_expired_token() {
        let verifier = LocalVerifier::new(SECRET, 0);
        assert_eq!(verifier.verify(&expired()), Err(LocalVerifyError::Expired));
    }

    #[test]
    fn test_wrong_secret() {
        let verifier = LocalVerifier::new(SECRET, 0);
        assert_eq!(
            verifier.verify(&foreign_key()),
            Err(LocalVerifyError::BadSignature)
        );
    }

    #[test]
    fn test_garbage_token() {
        let verifier = LocalVerifier::new(SECRET, 0);
        assert!(matches!(
            verifier.verify("not.a.jwt"),
            Err(LocalVerifyError::Malformed(_))
        ));
    }
}
