//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup, declared order)
//!     → matcher.rs (segment-boundary prefix check)
//!     → Return: matched RouteDescriptor or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile prefix matchers
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (declared order)

pub mod matcher;
pub mod router;

pub use router::{RouteDescriptor, RouteTable};
