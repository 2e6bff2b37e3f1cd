//! Component trait and shared descriptors.
//!
//! # States
//! ```text
//! Uninitialized → Initialized   (one-way, for the life of the process)
//! ```
//!
//! # Design Decisions
//! - `init` runs at most once per descriptor, guarded by `OnceLock`; concurrent
//!   first callers block until it finishes and then see the initialized component
//! - Descriptors are shared by every request; per-request state lives in
//!   [`ControllerContext`] and the controller's locals

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::component::response::{OutputMode, Response};
use crate::config::resolver::EffectiveConfig;
use crate::config::value::{Map, Value};
use crate::error::{ControllerError, DispatchError};
use crate::observability::metrics;
use crate::services::Services;

/// Everything a controller operation may use for one call.
pub struct ControllerContext<'a> {
    pub args: &'a Map,
    pub output: OutputMode,
    pub services: &'a Services,
    pub config: &'a EffectiveConfig,
    /// Request-level template globals (version, cobrand, role, browser).
    pub webapp: &'a Map,
    /// Path segments after `<component>/<operation>`.
    pub extra: &'a [String],
}

impl ControllerContext<'_> {
    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }

    /// A non-empty string argument.
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.arg(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }
}

/// A loadable unit of controller operations.
pub trait Component: Send + Sync {
    /// One-time setup, run before the first operation call.
    fn init(&self, _services: &Services) {}

    /// Names of the controller operations this component answers.
    fn operations(&self) -> &[&'static str];

    /// Run one operation. Only called with names listed by [`Component::operations`].
    fn call(&self, operation: &str, ctx: &ControllerContext<'_>) -> Result<Response, ControllerError>;
}

/// A registered component plus its initialization state.
pub struct ComponentDescriptor {
    name: String,
    component: Arc<dyn Component>,
    initialized: OnceLock<()>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, component: Arc<dyn Component>) -> Self {
        Self {
            name: name.into(),
            component,
            initialized: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get().is_some()
    }

    /// Run the component's `init` unless it already ran.
    pub fn ensure_initialized(&self, services: &Services) {
        self.initialized.get_or_init(|| {
            tracing::info!(component = %self.name, "Initializing component");
            self.component.init(services);
            metrics::record_component_init(&self.name);
        });
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.component.operations().iter().any(|op| *op == operation)
    }

    pub fn operations(&self) -> &[&'static str] {
        self.component.operations()
    }

    /// Invoke a controller operation by name.
    pub fn invoke(&self, operation: &str, ctx: &ControllerContext<'_>) -> Result<Response, DispatchError> {
        if !self.has_operation(operation) {
            return Err(DispatchError::OperationNotFound {
                component: self.name.clone(),
                operation: operation.to_string(),
            });
        }
        self.component
            .call(operation, ctx)
            .map_err(|source| DispatchError::Controller {
                component: self.name.clone(),
                operation: operation.to_string(),
                source,
            })
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("operations", &self.component.operations())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
