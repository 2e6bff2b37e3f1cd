//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that defaults name things the request path can actually reach
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::store::is_valid_config_name;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is not a valid socket address: {value}")]
    BadAddress { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("{field} is not a valid config name: {value}")]
    BadName { field: &'static str, value: String },
    #[error("unknown log level: {0}")]
    LogLevel(String),
}

/// Validate an application configuration, collecting every problem.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BadAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.request_timeout_secs",
        });
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::Zero {
            field: "server.max_body_size",
        });
    }
    if config.server.session_idle_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.session_idle_timeout_secs",
        });
    }
    if config.server.session_sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "server.session_sweep_interval_secs",
        });
    }
    if config.server.session_cookie.trim().is_empty() {
        errors.push(ValidationError::Empty {
            field: "server.session_cookie",
        });
    }

    let required = [
        ("app.role", &config.app.role),
        ("app.default_component", &config.app.default_component),
        ("app.default_operation", &config.app.default_operation),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::Empty { field });
        }
    }
    if !is_valid_config_name(&config.app.default_cobrand) {
        errors.push(ValidationError::BadName {
            field: "app.default_cobrand",
            value: config.app.default_cobrand.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::BadAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    let level = config.observability.log_level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
