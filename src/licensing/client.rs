//! Licensing Service client.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::licensing::types::{LicenseDecision, LicenseDetail};

/// A validation call that produced no decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// Connection refused or timed out.
    #[error("licensing service unavailable: {0}")]
    Unavailable(String),
    /// The service answered, but not with a usable decision.
    #[error("licensing service error: {0}")]
    Remote(String),
}

/// Asks the Licensing Service whether a tenant holds a module.
#[async_trait]
pub trait LicenseValidator: Send + Sync {
    async fn validate(&self, tenant_id: i64, module: &str) -> Result<LicenseDecision, ValidatorError>;
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    valida: bool,
    #[serde(default)]
    licencia: Option<WireLicense>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLicense {
    modulo_codigo: String,
    #[serde(default)]
    modulo_nombre: String,
    #[serde(default)]
    fecha_vencimiento: Option<String>,
    #[serde(default)]
    max_usuarios: u32,
}

impl TryFrom<WireLicense> for LicenseDetail {
    type Error = ValidatorError;

    fn try_from(wire: WireLicense) -> Result<Self, Self::Error> {
        let expires_at = wire
            .fecha_vencimiento
            .as_deref()
            .map(parse_expiry)
            .transpose()?;

        Ok(LicenseDetail {
            module_code: wire.modulo_codigo,
            module_name: wire.modulo_nombre,
            expires_at,
            max_seats: wire.max_usuarios,
        })
    }
}

/// Accepts RFC 3339, naive ISO datetimes and plain dates (midnight UTC).
fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, ValidatorError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ValidatorError::Remote(format!("unparseable fechaVencimiento `{raw}`")))
}

/// HTTP client for `GET /api/licencias/validate/{tenant}/{module}`.
pub struct HttpLicenseValidator {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpLicenseValidator {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn validate_url(&self, tenant_id: i64, module: &str) -> Result<Url, ValidatorError> {
        let tenant = tenant_id.to_string();
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ValidatorError::Remote(format!("cannot build url from {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "licencias", "validate", tenant.as_str(), module]);
        Ok(url)
    }
}

#[async_trait]
impl LicenseValidator for HttpLicenseValidator {
    async fn validate(&self, tenant_id: i64, module: &str) -> Result<LicenseDecision, ValidatorError> {
        let url = self.validate_url(tenant_id, module)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                ValidatorError::Unavailable(e.to_string())
            } else {
                ValidatorError::Remote(e.to_string())
            }
        })?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Ok(LicenseDecision::Denied);
        }
        if !status.is_success() {
            return Err(ValidatorError::Remote(format!("unexpected status {status}")));
        }

        let body: ValidateResponse = response
            .json()
            .await
            .map_err(|e| ValidatorError::Remote(e.to_string()))?;

        if !body.valida {
            return Ok(LicenseDecision::Denied);
        }
        let detail = body.licencia.map(LicenseDetail::try_from).transpose()?;
        Ok(LicenseDecision::Allowed(detail))
    }
}
