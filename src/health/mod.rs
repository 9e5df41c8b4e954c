//! Health surface.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → active.rs (probe every service's health path concurrently, bounded)
//!     → state.rs (aggregate: healthy only if all online)
//!     → 200 healthy / 503 degraded
//! ```

pub mod active;
pub mod state;

pub use active::HealthChecker;
pub use state::{HealthReport, OverallStatus, ServiceHealth, ServiceStatus};
