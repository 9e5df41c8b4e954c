//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the gateway components from configuration
//! - Create the Axum router (gateway fallback, `/health`, `/info`)
//! - Wire up middleware (request id, tracing, timeout, CORS, compression, rate limit)
//! - Serve until shutdown, running the license sweeper and rate limit pruner alongside

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::auth::{HttpAuthService, LocalVerifier, PrincipalResolver};
use crate::config::schema::PLACEHOLDER_SECRET;
use crate::config::validation::validate_config;
use crate::config::{ConfigError, CorsConfig, GatewayConfig};
use crate::gateway::GatewayDispatcher;
use crate::health::HealthChecker;
use crate::http::handlers::{gateway_handler, health_handler, info_handler};
use crate::http::transport::{ForwardingTransport, HyperTransport};
use crate::licensing::{CachePolicy, HttpLicenseValidator, LicenseGate, LicenseSweeper};
use crate::lifecycle::shutdown::wait as shutdown_signal;
use crate::routing::RouteTable;
use crate::security::{rate_limit_middleware, RateLimiter};

const HEALTH_PATH: &str = "/health";
const INFO_PATH: &str = "/info";

/// Failures while assembling the gateway from a validated config.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("service {name} has an invalid url: {source}")]
    InvalidServiceUrl {
        name: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{section} refers to unknown service {service}")]
    UnknownService { section: &'static str, service: String },
    #[error("invalid CORS origin {0}")]
    InvalidOrigin(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<GatewayDispatcher>,
    pub transport: Arc<dyn ForwardingTransport>,
    pub health: Arc<HealthChecker>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    sweeper: LicenseSweeper,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Assemble the gateway. The config is validated again here, so configs
    /// built in code get the same checks as `load_config` output.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let services = parse_services(&config.services)?;
        let service_url = |section: &'static str, name: &str| {
            services.get(name).cloned().ok_or_else(|| StartupError::UnknownService {
                section,
                service: name.to_string(),
            })
        };

        let timeouts = &config.timeouts;
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()?;

        // Principal resolution
        if config.auth.secret_key == PLACEHOLDER_SECRET {
            tracing::warn!("auth.secret_key is the placeholder value; set SECRET_KEY");
        }
        let auth_url = service_url("auth", &config.auth.service)?;
        let resolver = PrincipalResolver::new(
            LocalVerifier::new(&config.auth.secret_key, config.auth.leeway_secs),
            Arc::new(HttpAuthService::new(http.clone(), auth_url.as_str())),
            Duration::from_millis(config.auth.remote_timeout_ms),
        );

        // License gate
        let licensing_url = service_url("licensing", &config.licensing.service)?;
        let ttl = Duration::from_secs(config.licensing.ttl_secs);
        let gate = LicenseGate::new(
            Arc::new(HttpLicenseValidator::new(http, licensing_url)),
            CachePolicy {
                ttl,
                deny_ttl: Duration::from_secs(config.licensing.deny_ttl_secs),
                fetch_timeout: Duration::from_millis(config.licensing.request_timeout_ms),
                max_entries: config.licensing.max_entries,
            },
        );
        let sweeper = LicenseSweeper::new(gate.cache().clone(), ttl);

        let routes = RouteTable::from_config(config.routes.clone());
        for route in routes.routes() {
            tracing::info!(
                prefix = %route.path_prefix(),
                service = %route.target,
                requires_auth = route.requires_auth,
                module = route.required_module.as_deref().unwrap_or("-"),
                "Route configured"
            );
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            dispatcher: Arc::new(GatewayDispatcher::new(routes, resolver, gate)),
            transport: Arc::new(HyperTransport::new(
                client.clone(),
                services.clone(),
                Duration::from_secs(timeouts.upstream_secs),
            )),
            health: Arc::new(HealthChecker::new(
                client,
                services,
                config.health.path.clone(),
                Duration::from_millis(config.health.timeout_ms),
            )),
        };

        let limiter = config.rate_limit.enabled.then(|| {
            Arc::new(
                RateLimiter::from_config(&config.rate_limit)
                    .exempt([HEALTH_PATH.to_string(), INFO_PATH.to_string()]),
            )
        });

        let router = Self::build_router(&config, state, limiter.clone())?;
        Ok(Self {
            router,
            sweeper,
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(
        config: &GatewayConfig,
        state: AppState,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Result<Router, StartupError> {
        let mut router = Router::new()
            .route(HEALTH_PATH, get(health_handler))
            .route(INFO_PATH, get(info_handler))
            .fallback(gateway_handler)
            .with_state(state);

        if let Some(limiter) = limiter {
            router = router.layer(from_fn_with_state(limiter, rate_limit_middleware));
        } else {
            tracing::info!("Rate limiting disabled");
        }

        let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            // Health probes from orchestrators are noisy at info level.
            if request.uri().path() == HEALTH_PATH {
                tracing::debug_span!("request", method = %request.method(), uri = %request.uri(), request_id)
            } else {
                tracing::info_span!("request", method = %request.method(), uri = %request.uri(), request_id)
            }
        });

        Ok(router
            .layer(CompressionLayer::new())
            .layer(build_cors(&config.cors)?)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(trace)
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
    }

    /// Run the server until `shutdown` fires, accepting connections on `listener`.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = tokio::spawn(self.sweeper.run(shutdown.resubscribe()));
        let pruner = self
            .limiter
            .map(|limiter| tokio::spawn(limiter.run_pruner(shutdown.resubscribe())));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await;

        sweeper.abort();
        if let Some(pruner) = pruner {
            pruner.abort();
        }
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn parse_services(services: &BTreeMap<String, String>) -> Result<BTreeMap<String, Url>, StartupError> {
    services
        .iter()
        .map(|(name, raw)| {
            Url::parse(raw)
                .map(|url| (name.clone(), url))
                .map_err(|source| StartupError::InvalidServiceUrl {
                    name: name.clone(),
                    source,
                })
        })
        .collect()
}

/// `*` mirrors the caller's origin; otherwise only listed origins are allowed.
/// Credentials are allowed in both cases.
fn build_cors(config: &CorsConfig) -> Result<CorsLayer, StartupError> {
    if config.allowed_origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::very_permissive());
    }

    let origins = config
        .allowed_origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|_| StartupError::InvalidOrigin(o.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::ValidationError;

    #[test]
    fn test_unknown_auth_service_fails_startup() {
        let mut config = GatewayConfig::default();
        config.auth.service = "missing".into();

        let err = HttpServer::new(config).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::Validation(errors))
                if errors.contains(&ValidationError::UnknownCollaborator {
                    section: "auth",
                    service: "missing".into(),
                })
        ));
    }

    #[test]
    fn test_zero_license_ttl_fails_startup() {
        let mut config = GatewayConfig::default();
        config.licensing.ttl_secs = 0;
        config.licensing.deny_ttl_secs = 0;

        let err = HttpServer::new(config).err().unwrap();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::Validation(errors))
                if errors.contains(&ValidationError::ZeroValue("licensing.ttl_secs"))
        ));
    }

    #[test]
    fn test_invalid_origin_rejected() {
        let config = CorsConfig {
            allowed_origins: vec!["http://ok.example".into(), "bad\norigin".into()],
        };
        assert!(matches!(build_cors(&config), Err(StartupError::InvalidOrigin(_))));
    }

    #[test]
    fn test_default_config_builds() {
        assert!(HttpServer::new(GatewayConfig::default()).is_ok());
    }
}
