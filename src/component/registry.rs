//! Component registry.
//!
//! # Responsibilities
//! - Map component names to shared descriptors
//! - Construct descriptors lazily from a [`ComponentSource`] on first reference
//! - Return the same descriptor instance for a name for the life of the registry
//!
//! # Design Decisions
//! - One registry per process, passed by handle (no global singleton)
//! - Lazy construction happens under the map's entry lock, so two concurrent
//!   first lookups cannot build two descriptors

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::component::descriptor::{Component, ComponentDescriptor};
use crate::error::DispatchError;

/// Constructs components that were not registered up front.
pub trait ComponentSource: Send + Sync {
    fn load(&self, name: &str) -> Option<Arc<dyn Component>>;
}

type Factory = Box<dyn Fn() -> Arc<dyn Component> + Send + Sync>;

/// A source backed by named factory functions.
#[derive(Default)]
pub struct CatalogSource {
    factories: HashMap<String, Factory>,
}

impl CatalogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Component> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl ComponentSource for CatalogSource {
    fn load(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.factories.get(name).map(|factory| factory())
    }
}

/// Process-wide map of component descriptors.
#[derive(Default)]
pub struct ComponentRegistry {
    descriptors: DashMap<String, Arc<ComponentDescriptor>>,
    source: Option<Arc<dyn ComponentSource>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn ComponentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Register a component eagerly, replacing any previous descriptor.
    pub fn register(&self, name: impl Into<String>, component: Arc<dyn Component>) -> Arc<ComponentDescriptor> {
        let name = name.into();
        let descriptor = Arc::new(ComponentDescriptor::new(name.clone(), component));
        self.descriptors.insert(name, descriptor.clone());
        descriptor
    }

    /// Resolve a name to its shared descriptor, constructing it on first use.
    pub fn resolve(&self, name: &str) -> Result<Arc<ComponentDescriptor>, DispatchError> {
        if let Some(found) = self.descriptors.get(name) {
            return Ok(found.value().clone());
        }

        let not_found = || DispatchError::ComponentNotFound(name.to_string());
        let source = self.source.as_ref().ok_or_else(not_found)?;
        match self.descriptors.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let component = source.load(name).ok_or_else(not_found)?;
                tracing::debug!(component = %name, "Component constructed");
                let descriptor = Arc::new(ComponentDescriptor::new(name, component));
                entry.insert(descriptor.clone());
                Ok(descriptor)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
