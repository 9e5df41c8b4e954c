//! Business Gateway library.
//!
//! Authorization and license gating in front of the ERP backend services.

pub mod auth;
pub mod config;
pub mod gateway;
pub mod health;
pub mod http;
pub mod licensing;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatewayConfig;
pub use gateway::{ForwardDecision, GatewayDispatcher, GatewayError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
