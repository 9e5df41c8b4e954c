//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{GatewayConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: `{value}`")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from an optional TOML file, apply environment
/// overrides and validate the result.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the deployment environment variables on top of a parsed config.
///
/// `lookup` abstracts the process environment so overrides can be tested.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = port.parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            value: port.clone(),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }

    if let Some(secret) = lookup("SECRET_KEY") {
        config.auth.secret_key = secret;
    }

    for (name, url) in config.services.iter_mut() {
        let var = format!("{}_SERVICE_URL", name.to_uppercase().replace('-', "_"));
        if let Some(value) = lookup(&var) {
            *url = value;
        }
    }

    if let Some(origins) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
    }

    if let Some(window) = lookup("RATE_LIMIT_WINDOW_MS") {
        let ms: u64 = window.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_WINDOW_MS",
            value: window.clone(),
        })?;
        config.rate_limit.window_secs = ms.div_ceil(1000);
    }

    if let Some(max) = lookup("RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = max.parse().map_err(|_| ConfigError::Env {
            var: "RATE_LIMIT_MAX_REQUESTS",
            value: max.clone(),
        })?;
    }

    if let Some(format) = lookup("LOG_FORMAT") {
        config.observability.log_format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }

    Ok(())
}
