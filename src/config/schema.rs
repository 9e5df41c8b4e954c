//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend services by identifier (e.g. `auth` → `http://localhost:8000`).
    pub services: BTreeMap<String, String>,

    /// Route definitions, checked in declared order.
    pub routes: Vec<RouteConfig>,

    /// Token verification settings.
    pub auth: AuthConfig,

    /// License gate settings.
    pub licensing: LicensingConfig,

    /// Health surface settings.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-client rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            services: default_services(),
            routes: default_routes(),
            auth: AuthConfig::default(),
            licensing: LicensingConfig::default(),
            health: HealthConfig::default(),
            timeouts: TimeoutConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_services() -> BTreeMap<String, String> {
    [
        ("auth", "http://localhost:8000"),
        ("licensing", "http://localhost:3001"),
        ("employees", "http://localhost:8002"),
        ("clients", "http://localhost:8003"),
        ("sales", "http://localhost:8004"),
    ]
    .into_iter()
    .map(|(name, url)| (name.to_string(), url.to_string()))
    .collect()
}

fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::public("/api/auth", "auth"),
        RouteConfig::protected("/api/licencias", "licensing"),
        RouteConfig::protected("/api/modulos", "licensing"),
        RouteConfig::protected("/api/clientes-licensing", "licensing"),
        RouteConfig::protected("/api/empleados", "employees").with_module("EMPLEADOS"),
        RouteConfig::protected("/api/clientes", "clients").with_module("CLIENTES"),
        RouteConfig::protected("/api/ventas", "sales").with_module("VENTAS"),
        RouteConfig::protected("/api/cotizaciones", "sales").with_module("VENTAS"),
        RouteConfig::protected("/api/usuarios", "auth"),
        RouteConfig::protected("/api/perfiles", "auth"),
        RouteConfig::protected("/api/menu", "auth"),
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4000".to_string(),
        }
    }
}

/// Route configuration mapping a path prefix to a backend service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Path prefix to match (segment boundary).
    pub path_prefix: String,

    /// Service identifier, a key of `services`.
    pub target: String,

    /// Whether a bearer credential is required.
    #[serde(default = "default_requires_auth")]
    pub requires_auth: bool,

    /// Licensed module the caller's tenant must hold.
    #[serde(default)]
    pub required_module: Option<String>,
}

fn default_requires_auth() -> bool {
    true
}

impl RouteConfig {
    /// A route open to anonymous callers.
    pub fn public(path_prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            path_prefix: path_prefix.into(),
            target: target.into(),
            requires_auth: false,
            required_module: None,
        }
    }

    /// A route that requires an authenticated principal.
    pub fn protected(path_prefix: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            requires_auth: true,
            ..Self::public(path_prefix, target)
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.required_module = Some(module.into());
        self
    }
}

/// Token verification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HS256 secret used for local verification.
    pub secret_key: String,

    /// Service identifier of the Auth Service.
    pub service: String,

    /// Bound on the remote "who am I" call, in milliseconds.
    pub remote_timeout_ms: u64,

    /// Clock skew tolerated on `exp`, in seconds.
    pub leeway_secs: u64,
}

/// Secret shipped as a placeholder by the original deployment.
pub const PLACEHOLDER_SECRET: &str = "your-secret-key-here";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: PLACEHOLDER_SECRET.to_string(),
            service: "auth".to_string(),
            remote_timeout_ms: 5_000,
            leeway_secs: 0,
        }
    }
}

/// License gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LicensingConfig {
    /// Service identifier of the Licensing Service.
    pub service: String,

    /// Lifetime of a cached approval, in seconds. Also the sweep interval.
    pub ttl_secs: u64,

    /// Lifetime of a cached denial, in seconds. Must not exceed `ttl_secs`.
    pub deny_ttl_secs: u64,

    /// Bound on a validation call, in milliseconds.
    pub request_timeout_ms: u64,

    /// Upper bound on cached (tenant, module) entries.
    pub max_entries: usize,
}

impl Default for LicensingConfig {
    fn default() -> Self {
        Self {
            service: "licensing".to_string(),
            ttl_secs: 300,
            deny_ttl_secs: 300,
            request_timeout_ms: 5_000,
            max_entries: 10_000,
        }
    }
}

/// Health surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Path probed on each service.
    pub path: String,

    /// Probe timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            path: "/health".to_string(),
            timeout_ms: 3_000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for an inbound request, in seconds.
    pub request_secs: u64,

    /// Time allowed for the forwarded hop, in seconds.
    pub upstream_secs: u64,

    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 25,
            connect_secs: 5,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Window over which `max_requests` are allowed, in seconds.
    pub window_secs: u64,

    /// Requests allowed per client per window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 900,
            max_requests: 100,
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `*` mirrors any request origin.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_keeps_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:5000"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:5000");
        assert_eq!(config.routes.len(), 11);
        assert_eq!(config.licensing.ttl_secs, 300);
        assert_eq!(config.services["licensing"], "http://localhost:3001");
    }

    #[test]
    fn test_route_defaults_to_protected() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [[routes]]
            path_prefix = "/api/ventas"
            target = "sales"
            required_module = "VENTAS"
            "#,
        )
        .unwrap();

        assert_eq!(config.routes.len(), 1);
        let route = &config.routes[0];
        assert!(route.requires_auth);
        assert_eq!(route.required_module.as_deref(), Some("VENTAS"));
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
