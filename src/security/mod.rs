//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, 429 when empty)
//!     → Pass to gateway dispatcher
//! ```

pub mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimiter};
