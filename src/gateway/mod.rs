//! Gateway decision pipeline.
//!
//! # Data Flow
//! ```text
//! (path, headers)
//!     → RouteTable::resolve            404 RouteNotFound
//!     → PrincipalResolver::resolve     401 MissingCredential / InvalidOrExpired
//!     → LicenseGate::check             401 / 403 / 503 / 500
//!     → ForwardDecision {target, rewritten path, identity headers}
//! ```
//!
//! # Design Decisions
//! - The dispatcher never performs the network hop
//! - Each step runs only if the route asks for it, strictly in order

pub mod dispatcher;
pub mod error;
pub mod headers;

pub use dispatcher::{ForwardDecision, GatewayDispatcher};
pub use error::GatewayError;
pub use headers::{IdentityHeaders, IDENTITY_HEADERS};
