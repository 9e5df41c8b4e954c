//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events, pretty or JSON)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (log aggregation)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached by tower-http and carried in the trace span
//! - Metrics are cheap when no exporter is installed

pub mod logging;
pub mod metrics;
