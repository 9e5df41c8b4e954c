//! Identity headers attached to forwarded requests.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

use crate::auth::Principal;

pub const X_USER_ID: HeaderName = HeaderName::from_static("x-user-id");
pub const X_USUARIO: HeaderName = HeaderName::from_static("x-usuario");
pub const X_CLIENTE_ID: HeaderName = HeaderName::from_static("x-cliente-id");
pub const X_PERFIL_ID: HeaderName = HeaderName::from_static("x-perfil-id");
pub const X_MODULE: HeaderName = HeaderName::from_static("x-module");

/// Headers backends trust as gateway-asserted. Client copies are stripped.
pub const IDENTITY_HEADERS: [HeaderName; 5] = [X_USER_ID, X_USUARIO, X_CLIENTE_ID, X_PERFIL_ID, X_MODULE];

/// Builder over the optional identity fields.
#[derive(Debug, Default, Clone)]
pub struct IdentityHeaders {
    headers: HeaderMap,
}

impl IdentityHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// `X-User-Id` and `X-Usuario` always; tenant and profile only when known.
    pub fn principal(self, principal: &Principal) -> Self {
        self.set(X_USER_ID, &principal.subject_id.to_string())
            .set(X_USUARIO, &principal.display_name)
            .set_opt(X_CLIENTE_ID, principal.tenant_id)
            .set_opt(X_PERFIL_ID, principal.profile_id)
    }

    pub fn module(self, module: &str) -> Self {
        self.set(X_MODULE, module)
    }

    pub fn build(self) -> HeaderMap {
        self.headers
    }

    fn set_opt(self, name: HeaderName, value: Option<i64>) -> Self {
        match value {
            Some(v) => self.set(name, &v.to_string()),
            None => self,
        }
    }

    fn set(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(v) => {
                self.headers.insert(name, v);
            }
            Err(_) => tracing::warn!(header = %name, "Skipping identity header with invalid value"),
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(tenant: Option<i64>, profile: Option<i64>) -> Principal {
        Principal {
            subject_id: 7,
            display_name: "ana".into(),
            tenant_id: tenant,
            profile_id: profile,
        }
    }

    #[test]
    fn test_full_identity() {
        let headers = IdentityHeaders::new()
            .principal(&principal(Some(42), Some(3)))
            .module("EMPLEADOS")
            .build();

        assert_eq!(headers[X_USER_ID], "7");
        assert_eq!(headers[X_USUARIO], "ana");
        assert_eq!(headers[X_CLIENTE_ID], "42");
        assert_eq!(headers[X_PERFIL_ID], "3");
        assert_eq!(headers[X_MODULE], "EMPLEADOS");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let headers = IdentityHeaders::new().principal(&principal(None, None)).build();

        assert_eq!(headers.len(), 2);
        assert!(headers.get(X_CLIENTE_ID).is_none());
        assert!(headers.get(X_PERFIL_ID).is_none());
        assert!(headers.get(X_MODULE).is_none());
    }

    #[test]
    fn test_invalid_value_skipped() {
        let mut p = principal(Some(1), None);
        p.display_name = "bad\nname".into();
        let headers = IdentityHeaders::new().principal(&p).build();

        assert!(headers.get(X_USUARIO).is_none());
        assert_eq!(headers[X_USER_ID], "7");
    }
}
