//! Template collaborator consumed by controller bodies.
//!
//! Templates are plain text with `{{ dotted.path }}` tags looked up in the
//! render variables:
//! - `{{ blog.title }}` inserts the value HTML-escaped
//! - `{{ blog.title|raw }}` inserts it unescaped
//! - `{{ blogs|json }}` inserts the JSON encoding
//!
//! Missing paths render as the empty string.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::value::Value;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("unclosed tag in {template} at byte {offset}")]
    Unclosed { template: String, offset: usize },
    #[error("unknown filter '{filter}' in {template}")]
    UnknownFilter { template: String, filter: String },
    #[error("failed to read templates from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render collaborator.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, vars: &Value) -> Result<String, RenderError>;

    fn exists(&self, template: &str) -> bool;
}

/// An immutable set of named templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: HashMap<String, String>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.templates.insert(name.into(), source.into());
        self
    }

    /// Load every `.tpl` under `dir`, named by relative path with `/` separators.
    ///
    /// A missing directory yields an empty set.
    pub fn load_dir(dir: &Path) -> Result<Self, RenderError> {
        let mut set = Self::new();
        if dir.exists() {
            set.load_recursive(dir, dir)?;
        } else {
            tracing::warn!(dir = %dir.display(), "Templates directory does not exist");
        }
        tracing::info!(dir = %dir.display(), templates = set.len(), "Templates loaded");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    fn load_recursive(&mut self, root: &Path, dir: &Path) -> Result<(), RenderError> {
        let io_err = |source| RenderError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_dir() {
                self.load_recursive(root, &path)?;
            } else if path.extension().and_then(|e| e.to_str()) == Some("tpl") {
                let source = fs::read_to_string(&path).map_err(|source| RenderError::Io {
                    path: path.clone(),
                    source,
                })?;
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                self.templates.insert(name, source);
            }
        }
        Ok(())
    }
}

impl Renderer for TemplateSet {
    fn render(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        let source = self
            .templates
            .get(template)
            .ok_or_else(|| RenderError::NotFound(template.to_string()))?;

        let mut out = String::with_capacity(source.len());
        let mut rest = source.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let close = after.find("}}").ok_or_else(|| RenderError::Unclosed {
                template: template.to_string(),
                offset: source.len() - rest.len() + open,
            })?;
            out.push_str(&render_tag(template, after[..close].trim(), vars)?);
            rest = &after[close + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn exists(&self, template: &str) -> bool {
        self.templates.contains_key(template)
    }
}

fn render_tag(template: &str, tag: &str, vars: &Value) -> Result<String, RenderError> {
    let (path, filter) = match tag.split_once('|') {
        Some((path, filter)) => (path.trim(), Some(filter.trim())),
        None => (tag, None),
    };
    let Some(value) = vars.get_path(path) else {
        return Ok(String::new());
    };
    match filter {
        None => Ok(escape_html(&value.to_string())),
        Some("raw") => Ok(value.to_string()),
        Some("json") => Ok(serde_json::to_string(value).unwrap_or_default()),
        Some(other) => Err(RenderError::UnknownFilter {
            template: template.to_string(),
            filter: other.to_string(),
        }),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
