//! Per-request decision pipeline: route, principal, license, forward.

use axum::http::HeaderMap;

use crate::auth::{bearer_token, Principal, PrincipalResolver};
use crate::gateway::error::GatewayError;
use crate::gateway::headers::IdentityHeaders;
use crate::licensing::{DenyReason, LicenseGate, LicenseVerdict};
use crate::routing::{RouteDescriptor, RouteTable};

/// Where a request goes and which identity it carries.
#[derive(Debug, Clone)]
pub struct ForwardDecision {
    /// Service identifier from the route table.
    pub target: String,
    /// Path with the route prefix stripped.
    pub path: String,
    pub headers: HeaderMap,
    pub principal: Option<Principal>,
}

pub struct GatewayDispatcher {
    routes: RouteTable,
    resolver: PrincipalResolver,
    licenses: LicenseGate,
}

impl GatewayDispatcher {
    pub fn new(routes: RouteTable, resolver: PrincipalResolver, licenses: LicenseGate) -> Self {
        Self {
            routes,
            resolver,
            licenses,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn licenses(&self) -> &LicenseGate {
        &self.licenses
    }

    /// Decide the fate of one request. Nothing is forwarded on `Err`.
    pub async fn handle(&self, path: &str, headers: &HeaderMap) -> Result<ForwardDecision, GatewayError> {
        let route = self.routes.resolve(path).ok_or_else(|| GatewayError::RouteNotFound {
            path: path.to_string(),
            available: self.routes.prefixes(),
        })?;

        let principal = if route.requires_auth {
            Some(self.resolver.resolve(bearer_token(headers)).await?)
        } else {
            None
        };

        let mut identity = IdentityHeaders::new();
        if let Some(p) = &principal {
            identity = identity.principal(p);
        }

        if let Some(module) = &route.required_module {
            let principal = principal.as_ref().ok_or(GatewayError::NotAuthenticated)?;
            let module_code = self.authorize_module(route, principal, module, path).await?;
            identity = identity.module(&module_code);
        }

        Ok(ForwardDecision {
            target: route.target.clone(),
            path: route.rewrite(path).to_string(),
            headers: identity.build(),
            principal,
        })
    }

    /// Returns the module code to advertise downstream.
    async fn authorize_module(
        &self,
        route: &RouteDescriptor,
        principal: &Principal,
        module: &str,
        path: &str,
    ) -> Result<String, GatewayError> {
        match self.licenses.check(principal.tenant_id, module).await {
            LicenseVerdict::Allow(detail) => {
                let module_code = detail.map(|d| d.module_code).unwrap_or_else(|| module.to_string());
                tracing::info!(
                    action = "module_access",
                    user = principal.subject_id,
                    tenant = ?principal.tenant_id,
                    module = %module_code,
                    route = %route.path_prefix(),
                    path = %path,
                    "Module access granted"
                );
                Ok(module_code)
            }
            LicenseVerdict::Deny(DenyReason::TenantNotIdentified) => Err(GatewayError::TenantNotIdentified),
            LicenseVerdict::Deny(DenyReason::NotLicensed) => Err(GatewayError::ModuleDenied {
                module: module.to_string(),
            }),
            LicenseVerdict::Unavailable => Err(GatewayError::LicensingUnavailable),
            LicenseVerdict::Failed(reason) => Err(GatewayError::LicensingFailed { reason }),
        }
    }
}
