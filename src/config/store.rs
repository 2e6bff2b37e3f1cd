//! Named-config table and global settings.
//!
//! # Responsibilities
//! - Serve named configs (cobrands, browser classes) by name and role
//! - Serve the global settings tree by dotted path
//! - Swap in reloaded tables atomically
//!
//! # Design Decisions
//! - Tables live behind `ArcSwap`; readers never observe a half-updated tree
//! - A miss is an empty tree, never an error
//! - Names are checked before they reach the config source, since they come
//!   straight from request args

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;

use crate::config::loader::ConfigError;
use crate::config::value::{deep_merge, get_path, ConfigNode, Value};
use crate::observability::metrics;

/// Top-level key holding per-role overrides inside a named config.
pub const ROLE_OVERRIDES_KEY: &str = "role_overrides";

/// A named config with optional per-role override layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedConfig {
    base: ConfigNode,
    role_overrides: IndexMap<String, ConfigNode>,
}

impl NamedConfig {
    /// Split a raw tree into its base and its `role_overrides.<role>` tables.
    pub fn from_tree(mut tree: ConfigNode) -> Self {
        let mut role_overrides = IndexMap::new();
        if let Some(Value::Map(roles)) = tree.shift_remove(ROLE_OVERRIDES_KEY) {
            for (role, node) in roles {
                match node {
                    Value::Map(node) => {
                        role_overrides.insert(role, node);
                    }
                    other => {
                        tracing::warn!(role = %role, kind = other.kind(), "Ignoring non-table role override");
                    }
                }
            }
        }
        Self {
            base: tree,
            role_overrides,
        }
    }

    /// The base tree with the given role's overrides merged on top.
    pub fn for_role(&self, role: &str) -> ConfigNode {
        let mut out = self.base.clone();
        if let Some(overrides) = self.role_overrides.get(role) {
            deep_merge(&mut out, overrides);
        }
        out
    }
}

/// Everything the store serves, swapped as one unit.
#[derive(Debug, Clone, Default)]
pub struct ConfigTables {
    named: HashMap<String, NamedConfig>,
    settings: ConfigNode,
}

impl ConfigTables {
    pub fn new(settings: ConfigNode) -> Self {
        Self {
            named: HashMap::new(),
            settings,
        }
    }

    /// Add a named config from a raw tree.
    pub fn with_named(mut self, name: impl Into<String>, tree: ConfigNode) -> Self {
        self.named.insert(name.into(), NamedConfig::from_tree(tree));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, config: NamedConfig) {
        self.named.insert(name.into(), config);
    }

    pub fn settings(&self) -> &ConfigNode {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ConfigNode) {
        self.settings = settings;
    }

    pub fn len(&self) -> usize {
        self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.keys().map(String::as_str)
    }
}

/// Where named configs are (re)read from.
pub trait ConfigSource: Send + Sync {
    /// Load one named config. `Ok(None)` means it does not exist.
    fn load_named(&self, name: &str) -> Result<Option<NamedConfig>, ConfigError>;
}

/// Accept only plain config names: no path separators, no parent references.
pub fn is_valid_config_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Process-wide, read-mostly config store.
pub struct ConfigStore {
    tables: ArcSwap<ConfigTables>,
    source: Option<Arc<dyn ConfigSource>>,
}

impl ConfigStore {
    pub fn new(tables: ConfigTables) -> Self {
        Self {
            tables: ArcSwap::from_pointee(tables),
            source: None,
        }
    }

    /// Attach a source used when a lookup asks for a forced reload.
    pub fn with_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Fetch a named config for a role.
    ///
    /// With `force_reload`, the entry is re-read from the source first and the
    /// refreshed table swapped in. Unknown or invalid names yield an empty tree.
    pub fn get_named_config(&self, name: &str, force_reload: bool, role: &str) -> ConfigNode {
        if !is_valid_config_name(name) {
            tracing::warn!(name = %name, "Rejected invalid config name");
            return ConfigNode::new();
        }

        if force_reload {
            self.reload_named(name);
        }

        match self.tables.load().named.get(name) {
            Some(config) => config.for_role(role),
            None => {
                tracing::debug!(name = %name, role = %role, "Named config not found");
                ConfigNode::new()
            }
        }
    }

    /// Look up a dotted path in the global settings tree.
    pub fn get(&self, path: &str) -> Option<Value> {
        get_path(&self.tables.load().settings, path).cloned()
    }

    /// Atomically replace all tables.
    pub fn replace(&self, tables: ConfigTables) {
        tracing::info!(named_configs = tables.len(), "Config tables replaced");
        self.tables.store(Arc::new(tables));
    }

    /// Current tables; stays consistent for as long as the caller holds it.
    pub fn snapshot(&self) -> Arc<ConfigTables> {
        self.tables.load_full()
    }

    fn reload_named(&self, name: &str) {
        let Some(source) = &self.source else {
            return;
        };
        match source.load_named(name) {
            Ok(fresh) => {
                self.tables.rcu(|current| {
                    let mut next = ConfigTables::clone(current);
                    match &fresh {
                        Some(config) => {
                            next.named.insert(name.to_string(), config.clone());
                        }
                        None => {
                            next.named.remove(name);
                        }
                    }
                    next
                });
                metrics::record_config_reload("ok");
            }
            Err(e) => {
                tracing::error!(name = %name, error = %e, "Failed to reload named config, keeping current");
                metrics::record_config_reload("error");
            }
        }
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(ConfigTables::default())
    }
}
