//! Built-in components.

pub mod blog;

use std::sync::Arc;

use crate::component::descriptor::Component;
use crate::component::registry::CatalogSource;

/// Names of every component compiled into this crate.
pub const BUILTIN: &[&str] = &["blog"];

/// A catalog of the enabled built-in components. Unknown names are logged and skipped.
pub fn catalog(enabled: &[String]) -> CatalogSource {
    enabled.iter().fold(CatalogSource::new(), |catalog, name| match name.as_str() {
        "blog" => catalog.register("blog", || Arc::new(blog::BlogComponent::new()) as Arc<dyn Component>),
        other => {
            tracing::warn!(component = %other, "Unknown component in components.enabled; skipping");
            catalog
        }
    })
}
