//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build gateway → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, sweeper exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::watch_signals;
