//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides: PORT, SECRET_KEY, *_SERVICE_URL, ...)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the route table is a startup contract
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AuthConfig, CorsConfig, GatewayConfig, HealthConfig, LicensingConfig, ListenerConfig,
    LogFormat, ObservabilityConfig, RateLimitConfig, RouteConfig, TimeoutConfig,
};
