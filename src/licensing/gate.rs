//! License gate: tenant check plus cached validation.

use std::sync::Arc;

use crate::licensing::cache::{CachePolicy, LicenseCache};
use crate::licensing::client::{LicenseValidator, ValidatorError};
use crate::licensing::types::{LicenseDecision, LicenseDetail, LicenseKey};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The principal carries no tenant.
    TenantNotIdentified,
    /// The tenant has no active license for the module.
    NotLicensed,
}

/// What the gate decided for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LicenseVerdict {
    Allow(Option<LicenseDetail>),
    Deny(DenyReason),
    /// The Licensing Service could not be reached in time.
    Unavailable,
    /// The Licensing Service answered with something unusable.
    Failed(String),
}

pub struct LicenseGate {
    validator: Arc<dyn LicenseValidator>,
    cache: LicenseCache,
}

impl LicenseGate {
    pub fn new(validator: Arc<dyn LicenseValidator>, policy: CachePolicy) -> Self {
        Self {
            validator,
            cache: LicenseCache::new(policy),
        }
    }

    /// Handle to the shared cache, for the sweeper.
    pub fn cache(&self) -> &LicenseCache {
        &self.cache
    }

    pub async fn check(&self, tenant_id: Option<i64>, module: &str) -> LicenseVerdict {
        let Some(tenant_id) = tenant_id else {
            return LicenseVerdict::Deny(DenyReason::TenantNotIdentified);
        };

        let validator = Arc::clone(&self.validator);
        let owned_module = module.to_string();
        let (outcome, lookup) = self
            .cache
            .get_or_fetch(LicenseKey::new(tenant_id, module), move || async move {
                validator.validate(tenant_id, &owned_module).await
            })
            .await;

        metrics::record_license_lookup(lookup.as_str());

        match outcome {
            Ok(LicenseDecision::Allowed(detail)) => LicenseVerdict::Allow(detail),
            Ok(LicenseDecision::Denied) => LicenseVerdict::Deny(DenyReason::NotLicensed),
            Err(ValidatorError::Unavailable(reason)) => {
                tracing::warn!(tenant_id, module, %reason, "Licensing service unavailable");
                LicenseVerdict::Unavailable
            }
            Err(ValidatorError::Remote(reason)) => {
                tracing::error!(tenant_id, module, %reason, "License validation failed");
                LicenseVerdict::Failed(reason)
            }
        }
    }
}
