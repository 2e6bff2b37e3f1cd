//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::store::{is_valid_config_name, ConfigSource, ConfigTables, NamedConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::value::ConfigNode;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate the application configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = read(path)?;
    let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load one named config file.
pub fn load_named_config(path: &Path) -> Result<NamedConfig, ConfigError> {
    let content = read(path)?;
    let tree: ConfigNode = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(NamedConfig::from_tree(tree))
}

/// Load every `<name>.toml` in `dir` into a table, with `settings` as the global tree.
///
/// A missing directory yields an empty table; a malformed file fails the whole load.
pub fn load_config_tables(dir: &Path, settings: ConfigNode) -> Result<ConfigTables, ConfigError> {
    let mut tables = ConfigTables::new(settings);
    if !dir.exists() {
        tracing::warn!(dir = %dir.display(), "Config directory does not exist");
        return Ok(tables);
    }

    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_valid_config_name(name) {
            tracing::warn!(file = %path.display(), "Skipping config with invalid name");
            continue;
        }
        tables.insert(name, load_named_config(&path)?);
    }

    tracing::info!(dir = %dir.display(), named_configs = tables.len(), "Config tables loaded");
    Ok(tables)
}

/// Reads named configs from a directory of TOML files.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ConfigSource for DirectorySource {
    fn load_named(&self, name: &str) -> Result<Option<NamedConfig>, ConfigError> {
        let path = self.dir.join(format!("{}.toml", name));
        if !path.exists() {
            return Ok(None);
        }
        load_named_config(&path).map(Some)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
