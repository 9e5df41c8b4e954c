//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference existing services)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect duplicate route prefixes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),

    #[error("service `{name}` has invalid url `{url}`")]
    InvalidServiceUrl { name: String, url: String },

    #[error("route prefix `{0}` must start with '/'")]
    InvalidRoutePrefix(String),

    #[error("route prefix `{0}` is declared more than once")]
    DuplicateRoutePrefix(String),

    #[error("route `{prefix}` targets unknown service `{service}`")]
    UnknownRouteTarget { prefix: String, service: String },

    #[error("route `{0}` has an empty required_module")]
    EmptyModule(String),

    #[error("{section}.service references unknown service `{service}`")]
    UnknownCollaborator { section: &'static str, service: String },

    #[error("auth.secret_key must not be empty")]
    EmptySecret,

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("licensing.deny_ttl_secs ({deny_ttl}) must not exceed licensing.ttl_secs ({ttl})")]
    DenyTtlExceedsTtl { deny_ttl: u64, ttl: u64 },
}

/// Validate a configuration, collecting every problem.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for (name, url) in &config.services {
        let valid = Url::parse(url)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidServiceUrl {
                name: name.clone(),
                url: url.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for route in &config.routes {
        if !route.path_prefix.starts_with('/') {
            errors.push(ValidationError::InvalidRoutePrefix(route.path_prefix.clone()));
        }
        if !seen.insert(route.path_prefix.as_str()) {
            errors.push(ValidationError::DuplicateRoutePrefix(route.path_prefix.clone()));
        }
        if !config.services.contains_key(&route.target) {
            errors.push(ValidationError::UnknownRouteTarget {
                prefix: route.path_prefix.clone(),
                service: route.target.clone(),
            });
        }
        if matches!(route.required_module.as_deref(), Some(m) if m.trim().is_empty()) {
            errors.push(ValidationError::EmptyModule(route.path_prefix.clone()));
        }
    }

    for (section, service) in [
        ("auth", &config.auth.service),
        ("licensing", &config.licensing.service),
    ] {
        if !config.services.contains_key(service) {
            errors.push(ValidationError::UnknownCollaborator {
                section,
                service: service.clone(),
            });
        }
    }

    if config.auth.secret_key.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }

    let positive = [
        ("auth.remote_timeout_ms", config.auth.remote_timeout_ms),
        ("licensing.ttl_secs", config.licensing.ttl_secs),
        ("licensing.deny_ttl_secs", config.licensing.deny_ttl_secs),
        ("licensing.request_timeout_ms", config.licensing.request_timeout_ms),
        ("licensing.max_entries", config.licensing.max_entries as u64),
        ("health.timeout_ms", config.health.timeout_ms),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("timeouts.upstream_secs", config.timeouts.upstream_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::ZeroValue(field));
        }
    }

    if config.licensing.deny_ttl_secs > config.licensing.ttl_secs {
        errors.push(ValidationError::DenyTtlExceedsTtl {
            deny_ttl: config.licensing.deny_ttl_secs,
            ttl: config.licensing.ttl_secs,
        });
    }

    if config.rate_limit.enabled {
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError::ZeroValue("rate_limit.window_secs"));
        }
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError::ZeroValue("rate_limit.max_requests"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.routes.push(RouteConfig::protected("api/x", "nowhere"));
        config.routes.push(RouteConfig::public("/api/auth", "auth"));
        config.licensing.ttl_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidBindAddress("not-an-address".into())));
        assert!(errors.contains(&ValidationError::InvalidRoutePrefix("api/x".into())));
        assert!(errors.contains(&ValidationError::UnknownRouteTarget {
            prefix: "api/x".into(),
            service: "nowhere".into(),
        }));
        assert!(errors.contains(&ValidationError::DuplicateRoutePrefix("/api/auth".into())));
        assert!(errors.contains(&ValidationError::ZeroValue("licensing.ttl_secs")));
    }

    #[test]
    fn test_rejects_non_http_service_url() {
        let mut config = GatewayConfig::default();
        config.services.insert("sales".into(), "ftp://files".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::InvalidServiceUrl {
                name: "sales".into(),
                url: "ftp://files".into(),
            }]
        );
    }

    #[test]
    fn test_collaborators_must_exist() {
        let mut config = GatewayConfig::default();
        config.licensing.service = "licenses".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownCollaborator {
                section: "licensing",
                service: "licenses".into(),
            }]
        );
    }

    #[test]
    fn test_deny_ttl_cannot_exceed_ttl() {
        let mut config = GatewayConfig::default();
        config.licensing.ttl_secs = 300;
        config.licensing.deny_ttl_secs = 600;

        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::DenyTtlExceedsTtl {
                deny_ttl: 600,
                ttl: 300,
            }])
        );

        config.licensing.deny_ttl_secs = 60;
        assert_eq!(validate_config(&config), Ok(()));
    }
}
