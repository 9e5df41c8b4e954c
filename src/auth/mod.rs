//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → resolver.rs (extract credential; MissingCredential if absent)
//!     → local.rs (HS256 signature + exp, no I/O)
//!         ok   → Principal
//!         fail → remote.rs (GET /api/auth/me, bounded timeout)
//!                   ok   → Principal
//!                   fail → InvalidOrExpired
//! ```
//!
//! # Design Decisions
//! - Local first, remote second, never in parallel
//! - Any local failure (expired, bad signature, malformed) triggers the fallback
//! - Remote failures are never retried

pub mod local;
pub mod principal;
pub mod remote;
pub mod resolver;

pub use local::{LocalVerifier, LocalVerifyError};
pub use principal::Principal;
pub use remote::{HttpAuthService, RemoteAuthError, RemoteIdentity};
pub use resolver::{bearer_token, AuthError, PrincipalResolver, Resolution};
