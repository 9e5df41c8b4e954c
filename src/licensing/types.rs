//! License cache types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Cache key: one tenant's access to one module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LicenseKey {
    pub tenant_id: i64,
    pub module: String,
}

impl LicenseKey {
    pub fn new(tenant_id: i64, module: impl Into<String>) -> Self {
        Self {
            tenant_id,
            module: module.into(),
        }
    }
}

/// Details of an active license, as reported by the Licensing Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseDetail {
    pub module_code: String,
    pub module_name: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_seats: u32,
}

/// An explicit answer from the Licensing Service. Only these are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseDecision {
    Allowed(Option<LicenseDetail>),
    Denied,
}

impl LicenseDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, LicenseDecision::Allowed(_))
    }
}

/// A cached decision and when it was fetched.
#[derive(Debug, Clone)]
pub struct LicenseCacheEntry {
    pub decision: LicenseDecision,
    pub fetched_at: Instant,
}
