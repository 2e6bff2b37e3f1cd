//! Component subsystem.
//!
//! # Data Flow
//! ```text
//! component name
//!     → registry.rs (shared descriptor, built lazily from a source)
//!     → descriptor.rs (one-shot init, operation lookup)
//!     → Component::call (controller body, uses Services)
//!     → response.rs (structured Response)
//! ```

pub mod descriptor;
pub mod registry;
pub mod response;

pub use descriptor::{Component, ComponentDescriptor, ControllerContext};
pub use registry::{CatalogSource, ComponentRegistry, ComponentSource};
pub use response::{component_response, Content, OutputMode, Response, ResponseType};
