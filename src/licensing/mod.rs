//! License gating subsystem.
//!
//! # Data Flow
//! ```text
//! (tenant, module)
//!     → gate.rs (tenant present? else TenantNotIdentified)
//!     → cache.rs (fresh entry? serve; in flight? wait; else own the fetch)
//!     → client.rs (GET /api/licencias/validate/{tenant}/{module})
//!     → LicenseVerdict
//!
//! sweeper.rs: every TTL, evict stale entries until shutdown
//! ```
//!
//! # Design Decisions
//! - Fail closed: unreachable or broken licensing never grants access
//! - Explicit denials are cached like approvals; errors are not cached

pub mod cache;
pub mod client;
pub mod gate;
pub mod sweeper;
pub mod types;

pub use cache::{CachePolicy, LicenseCache, Lookup};
pub use client::{HttpLicenseValidator, LicenseValidator, ValidatorError};
pub use gate::{DenyReason, LicenseGate, LicenseVerdict};
pub use sweeper::LicenseSweeper;
pub use types::{LicenseCacheEntry, LicenseDecision, LicenseDetail, LicenseKey};
