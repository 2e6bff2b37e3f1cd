//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! app.toml
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!
//! config_dir/<name>.toml
//!     → loader.rs (named-config tables)
//!     → store.rs (ConfigStore, shared via Arc)
//!
//! Per request:
//!     RequestContext + ConfigStore + Session
//!     → resolver.rs (strict layer order)
//!     → EffectiveConfig (owned by the request, read-only)
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads new tables
//!     → atomic swap inside ConfigStore
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Lookups that miss return empty trees rather than errors

pub mod loader;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod validation;
pub mod value;
pub mod watcher;

pub use loader::ConfigError;
pub use resolver::{ConfigResolver, EffectiveConfig};
pub use schema::{AppConfig, AppSettings, ComponentsConfig, ObservabilityConfig, ServerConfig};
pub use store::{ConfigSource, ConfigStore, ConfigTables, NamedConfig};
pub use value::{ConfigNode, Map, Value, ValueError};
