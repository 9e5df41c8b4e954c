//! Gateway failures and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;

/// Every way a request can be refused before or during forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("no bearer credential supplied")]
    MissingCredential,
    #[error("credential is invalid or expired")]
    InvalidOrExpired,
    #[error("module route reached without an authenticated principal")]
    NotAuthenticated,
    #[error("principal has no tenant")]
    TenantNotIdentified,
    #[error("module {module} is not licensed")]
    ModuleDenied { module: String },
    #[error("licensing service unavailable")]
    LicensingUnavailable,
    #[error("license validation failed: {reason}")]
    LicensingFailed { reason: String },
    #[error("no route for {path}")]
    RouteNotFound { path: String, available: Vec<String> },
    #[error("upstream {service} unavailable: {reason}")]
    UpstreamUnavailable { service: String, reason: String },
    #[error("rate limit exceeded")]
    RateLimited,
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredential => GatewayError::MissingCredential,
            AuthError::InvalidOrExpired => GatewayError::InvalidOrExpired,
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MissingCredential
            | GatewayError::InvalidOrExpired
            | GatewayError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::TenantNotIdentified | GatewayError::ModuleDenied { .. } => StatusCode::FORBIDDEN,
            GatewayError::LicensingUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::LicensingFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => "MISSING_CREDENTIAL",
            GatewayError::InvalidOrExpired => "INVALID_OR_EXPIRED_TOKEN",
            GatewayError::NotAuthenticated => "NOT_AUTHENTICATED",
            GatewayError::TenantNotIdentified => "TENANT_NOT_IDENTIFIED",
            GatewayError::ModuleDenied { .. } => "MODULE_DENIED",
            GatewayError::LicensingUnavailable => "LICENSING_UNAVAILABLE",
            GatewayError::LicensingFailed { .. } => "LICENSING_FAILED",
            GatewayError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            GatewayError::UpstreamUnavailable { .. } => "UPSTREAM_UNAVAILABLE",
            GatewayError::RateLimited => "RATE_LIMITED",
        }
    }

    // Client-facing texts are the ones existing ERP frontends already display.
    fn title(&self) -> String {
        match self {
            GatewayError::MissingCredential => "Token no proporcionado".into(),
            GatewayError::InvalidOrExpired => "Token inválido o expirado".into(),
            GatewayError::NotAuthenticated => "Usuario no autenticado".into(),
            GatewayError::TenantNotIdentified => "Cliente no identificado".into(),
            GatewayError::ModuleDenied { module } => format!("Módulo '{module}' no está activo"),
            GatewayError::LicensingUnavailable => "Servicio de licencias no disponible".into(),
            GatewayError::LicensingFailed { .. } => "Error validando licencia".into(),
            GatewayError::RouteNotFound { .. } => "Ruta no encontrada".into(),
            GatewayError::UpstreamUnavailable { .. } => "Error de comunicación con el servicio".into(),
            GatewayError::RateLimited => "Demasiadas peticiones".into(),
        }
    }

    fn message(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => "Debe incluir el header Authorization: Bearer <token>",
            GatewayError::InvalidOrExpired => "No se pudo validar el token de autenticación",
            GatewayError::NotAuthenticated => "Debe autenticarse antes de acceder a este recurso",
            GatewayError::TenantNotIdentified => "El usuario no está asociado a un cliente",
            GatewayError::ModuleDenied { .. } => "Contacte al administrador para activar este módulo",
            GatewayError::LicensingUnavailable => "No se puede validar el acceso al módulo en este momento",
            GatewayError::LicensingFailed { .. } => "Ocurrió un error al verificar su acceso",
            GatewayError::RouteNotFound { .. } => "La ruta solicitada no existe en este gateway",
            GatewayError::UpstreamUnavailable { .. } => "Servicio no disponible",
            GatewayError::RateLimited => "Has excedido el límite de peticiones. Intenta más tarde.",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    code: &'static str,
    error: String,
    message: &'static str,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    modulo: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_routes: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<&'a str>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request refused");
        }

        let mut body = ErrorBody {
            code: self.code(),
            error: self.title(),
            message: self.message(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            modulo: None,
            path: None,
            available_routes: None,
            service: None,
        };
        match &self {
            GatewayError::ModuleDenied { module } => body.modulo = Some(module.as_str()),
            GatewayError::RouteNotFound { path, available } => {
                body.path = Some(path.as_str());
                body.available_routes = Some(available.as_slice());
            }
            GatewayError::UpstreamUnavailable { service, .. } => body.service = Some(service.as_str()),
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
