//! Request handlers: gateway fallback, health and info surfaces.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::gateway::GatewayError;
use crate::http::server::AppState;
use crate::observability::metrics;

/// Every path not claimed by another route goes through the dispatcher.
pub async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let decision = match state.dispatcher.handle(&path, request.headers()).await {
        Ok(decision) => decision,
        Err(err) => {
            metrics::record_request(&method, err.status().as_u16(), "none", started);
            return err.into_response();
        }
    };

    let service = decision.target.clone();
    let subject_id = decision.principal.as_ref().map(|p| p.subject_id);
    match state.transport.forward(decision, request).await {
        Ok(response) => {
            metrics::record_request(&method, response.status().as_u16(), &service, started);
            response
        }
        Err(e) => {
            tracing::warn!(service = %service, path = %path, subject_id, error = %e, "Upstream error");
            let err = GatewayError::UpstreamUnavailable {
                service,
                reason: e.to_string(),
            };
            metrics::record_request(&method, err.status().as_u16(), "none", started);
            err.into_response()
        }
    }
}

pub async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.health.check_all().await;
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteInfo<'a> {
    path: &'a str,
    require_auth: bool,
    require_module: Option<&'a str>,
}

#[derive(Serialize)]
struct GatewayInfo<'a> {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    routes: Vec<RouteInfo<'a>>,
}

pub async fn info_handler(State(state): State<AppState>) -> Response {
    let routes = state
        .dispatcher
        .routes()
        .routes()
        .iter()
        .map(|r| RouteInfo {
            path: r.path_prefix(),
            require_auth: r.requires_auth,
            require_module: r.required_module.as_deref(),
        })
        .collect();

    Json(GatewayInfo {
        name: "Business Gateway",
        version: env!("CARGO_PKG_VERSION"),
        description: "API Gateway para Business ERP",
        routes,
    })
    .into_response()
}
