//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber (HTTP server, config watcher loop) stops
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - In-flight requests finish before the server returns (axum graceful shutdown)
//! - The shutdown signal is one-shot; late subscribers still see it via `is_triggered`

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
