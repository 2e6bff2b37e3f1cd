//! Configuration schema definitions.
//!
//! This module defines the application configuration (the `app.toml` file).
//! All types derive Serde traits for deserialization from config files.
//! Per-site trees (cobrands, browser classes) are not typed here; they are
//! free-form [`ConfigNode`]s served by the config store.

use serde::{Deserialize, Serialize};

use crate::config::value::ConfigNode;

/// Root application configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP front settings (bind address, limits, session cookie).
    pub server: ServerConfig,

    /// Request-handling defaults (cobrand, role, routing fallbacks).
    pub app: AppSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Which components the registry may construct.
    pub components: ComponentsConfig,

    /// Global settings tree, readable by dotted path.
    pub settings: ConfigNode,
}

/// HTTP front configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Name of the session cookie.
    pub session_cookie: String,

    /// Seconds a session may sit idle before it is dropped.
    pub session_idle_timeout_secs: u64,

    /// Seconds between sweeps for idle sessions.
    pub session_sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
            session_cookie: "elation_sid".to_string(),
            session_idle_timeout_secs: 30 * 60,
            session_sweep_interval_secs: 60,
        }
    }
}

/// Request-handling defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppSettings {
    /// Cobrand used when neither the request nor the session names one.
    pub default_cobrand: String,

    /// Server role (dev, test, live); `args._role` overrides it per request.
    pub role: String,

    /// Component for an empty path.
    pub default_component: String,

    /// Operation for a path that names only a component.
    pub default_operation: String,

    /// Directory of `<name>.toml` named configs.
    pub config_dir: String,

    /// Directory of `.tpl` templates.
    pub templates_dir: String,

    /// Application version exposed to templates.
    pub version: String,

    /// Watch `config_dir` and hot-swap reloaded tables.
    pub watch_config: bool,

    /// Re-read the cobrand config from disk on every request (development).
    pub reload_named_configs: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_cobrand: "thefind".to_string(),
            role: "dev".to_string(),
            default_component: "index".to_string(),
            default_operation: "index".to_string(),
            config_dir: "config/sites".to_string(),
            templates_dir: "templates".to_string(),
            version: "development".to_string(),
            watch_config: false,
            reload_named_configs: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Component availability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComponentsConfig {
    /// Component names the lazy registry source may construct.
    pub enabled: Vec<String>,
}

impl Default for ComponentsConfig {
    fn default() -> Self {
        Self {
            enabled: vec!["blog".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::value::Value;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.app.default_cobrand, "thefind");
        assert_eq!(config.app.role, "dev");
        assert_eq!(config.server.session_cookie, "elation_sid");
        assert_eq!(config.components.enabled, vec!["blog".to_string()]);
        assert!(config.settings.is_empty());
    }

    #[test]
    fn test_partial_sections_and_settings_tree() {
        let config: AppConfig = toml::from_str(
            r#"
            [app]
            role = "live"

            [settings.api.version]
            default = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.app.role, "live");
        assert_eq!(config.app.default_operation, "index");
        assert_eq!(
            crate::config::value::get_path(&config.settings, "api.version.default"),
            Some(&Value::Int(3))
        );
    }
}
