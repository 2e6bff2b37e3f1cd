//! Path → component → operation dispatch.
//!
//! # Data Flow
//! ```text
//! dispatch(path, args)
//!     → PathParser (component, operation, output mode, extra segments)
//!     → ComponentRegistry::resolve      (ComponentNotFound)
//!     → ComponentDescriptor::ensure_initialized (exactly once per process)
//!     → ComponentDescriptor::invoke     (OperationNotFound | Controller)
//!     → Response, unchanged
//! ```
//!
//! # Design Decisions
//! - The dispatcher never catches controller failures; the caller renders them
//! - Synchronous from end to end; async transports call it from a blocking task

use std::sync::Arc;
use std::time::Instant;

use crate::component::descriptor::ControllerContext;
use crate::component::registry::ComponentRegistry;
use crate::component::response::Response;
use crate::config::resolver::EffectiveConfig;
use crate::config::value::Map;
use crate::error::DispatchError;
use crate::observability::metrics;
use crate::routing::path::PathParser;
use crate::services::Services;

pub struct Dispatcher {
    registry: Arc<ComponentRegistry>,
    parser: Arc<dyn PathParser>,
    services: Services,
}

impl Dispatcher {
    pub fn new(registry: Arc<ComponentRegistry>, parser: Arc<dyn PathParser>, services: Services) -> Self {
        Self {
            registry,
            parser,
            services,
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Dispatch with an empty effective config and no template globals.
    pub fn dispatch(&self, path: &str, args: &Map) -> Result<Response, DispatchError> {
        self.dispatch_scoped(path, args, &EffectiveConfig::default(), &Map::new())
    }

    /// Dispatch one request against a resolved configuration.
    pub fn dispatch_scoped(
        &self,
        path: &str,
        args: &Map,
        config: &EffectiveConfig,
        webapp: &Map,
    ) -> Result<Response, DispatchError> {
        let start = Instant::now();
        let parsed = self.parser.parse(path);

        let descriptor = match self.registry.resolve(&parsed.component) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::warn!(path = %path, component = %parsed.component, "Component not found");
                metrics::record_dispatch("unknown", &parsed.operation, "component_not_found", start);
                return Err(e);
            }
        };

        descriptor.ensure_initialized(&self.services);

        let ctx = ControllerContext {
            args,
            output: parsed.output,
            services: &self.services,
            config,
            webapp,
            extra: &parsed.extra,
        };
        let result = descriptor.invoke(&parsed.operation, &ctx);

        match &result {
            Ok(response) => {
                tracing::debug!(
                    component = %parsed.component,
                    operation = %parsed.operation,
                    response_type = response.response_type.as_str(),
                    "Dispatched"
                );
                metrics::record_dispatch(&parsed.component, &parsed.operation, "ok", start);
            }
            Err(DispatchError::OperationNotFound { .. }) => {
                tracing::warn!(component = %parsed.component, operation = %parsed.operation, "Operation not found");
                metrics::record_dispatch(&parsed.component, "unknown", "operation_not_found", start);
            }
            Err(e) => {
                tracing::error!(
                    component = %parsed.component,
                    operation = %parsed.operation,
                    error = ?e,
                    "Controller failed"
                );
                metrics::record_dispatch(&parsed.component, &parsed.operation, "error", start);
            }
        }
        result
    }
}
