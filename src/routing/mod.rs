//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path ("/blog/view.ajax/extra")
//!     → path.rs (component "blog", operation "view", output Ajax, extra ["extra"])
//!     → dispatcher.rs (registry lookup, one-shot init, operation call)
//!     → Response | DispatchError
//! ```
//!
//! # Design Decisions
//! - The path convention is a strategy injected into the dispatcher
//! - Deterministic: the same path always parses to the same target
//! - Structural misses are typed errors, never defaults

pub mod dispatcher;
pub mod path;

pub use dispatcher::Dispatcher;
pub use path::{ParsedPath, PathParser, SegmentPathParser};
