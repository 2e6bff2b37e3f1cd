//! Dispatch and controller error types.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::config::value::ValueError;
use crate::services::orm::OrmError;
use crate::services::template::RenderError;

/// Structural dispatch failures plus controller failures passed through untouched.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No descriptor registered and none could be constructed.
    #[error("component not found: {0}")]
    ComponentNotFound(String),

    /// The component exists but has no such controller operation.
    #[error("operation '{operation}' not found on component '{component}'")]
    OperationNotFound { component: String, operation: String },

    /// The controller failed; the dispatcher does not catch or render this.
    #[error("{component}/{operation} failed")]
    Controller {
        component: String,
        operation: String,
        #[source]
        source: ControllerError,
    },
}

impl DispatchError {
    /// True for the "nothing answers this path" cases.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::ComponentNotFound(_) | DispatchError::OperationNotFound { .. }
        )
    }

    /// Short name of the failure, shown by the exception view.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::ComponentNotFound(_) => "ComponentNotFound",
            DispatchError::OperationNotFound { .. } => "OperationNotFound",
            DispatchError::Controller { source, .. } => match source {
                ControllerError::Orm(_) => "OrmError",
                ControllerError::Render(_) => "RenderError",
                ControllerError::Value(_) => "ValueError",
                ControllerError::InvalidArgument { .. } => "InvalidArgument",
            },
        }
    }
}

/// Failures raised inside controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("orm error")]
    Orm(#[from] OrmError),

    #[error("render error")]
    Render(#[from] RenderError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}

/// Failures building an [`App`](crate::app::App) at startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load templates: {0}")]
    Templates(#[from] RenderError),
}
