//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → handlers.rs (gateway fallback, /health, /info)
//!     → [gateway dispatcher decides route, principal, license]
//!     → transport.rs (forward to the target service)
//!     → Send response to client
//! ```

pub mod handlers;
pub mod server;
pub mod transport;

pub use server::{AppState, HttpServer, StartupError};
pub use transport::{ForwardingTransport, HyperTransport, TransportError};
