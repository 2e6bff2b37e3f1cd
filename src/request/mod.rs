//! Request intake subsystem.
//!
//! # Data Flow
//! ```text
//! transport (HTTP query/form, CLI key=value)
//!     → args.rs (bracket-nested argument decoding)
//!     → context.rs (immutable RequestContext: path, args, browser)
//!         → browser.rs (user-agent classification)
//!     → session.rs (sticky values carried between requests)
//! ```
//!
//! # Design Decisions
//! - Building a context never fails; bad input degrades to empty values
//! - Sessions are passed explicitly, never read from globals

pub mod args;
pub mod browser;
pub mod context;
pub mod session;

pub use context::RequestContext;
pub use session::{Session, SessionHandle, SessionStore};
