//! ORM collaborator consumed by controller bodies.
//!
//! # Responsibilities
//! - Load entities by key, reporting a miss as [`Lookup::NotFound`]
//! - Save and select entities of model-declared types
//! - Activate models on demand (`load_model`), as component `init` does
//!
//! # Design Decisions
//! - A miss is a value, not an error; errors mean the store itself failed
//! - Entities are field bags; each type names its key field in its model

use std::cmp::Ordering;
use std::collections::HashMap;

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::config::value::{Map, Value};

/// A stored record: its type plus a field mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    #[serde(skip)]
    entity_type: String,
    #[serde(flatten)]
    fields: Map,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map {
        &self.fields
    }

    /// The entity's fields as a template value.
    pub fn to_value(&self) -> Value {
        Value::Map(self.fields.clone())
    }
}

/// Outcome of a keyed load.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(v) => Some(v),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Equality filters, an optional ordering and an optional limit.
#[derive(Debug, Clone, Default)]
pub struct Criteria {
    filters: Vec<(String, Value)>,
    order_by: Option<(String, SortOrder)>,
    limit: Option<usize>,
}

impl Criteria {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, entity: &Entity) -> bool {
        self.filters
            .iter()
            .all(|(field, expected)| entity.get(field) == Some(expected))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrmError {
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("entity type not loaded: {0}")]
    UnknownEntityType(String),
    #[error("{entity_type} entity is missing key field '{field}'")]
    MissingKey { entity_type: String, field: String },
    #[error("storage failure: {0}")]
    Storage(String),
}

/// ORM collaborator.
pub trait Orm: Send + Sync {
    /// Make a model's entity types available.
    fn load_model(&self, model: &str) -> Result<(), OrmError>;

    /// Load one entity by key.
    fn load(&self, entity_type: &str, key: &str) -> Result<Lookup<Entity>, OrmError>;

    /// Insert or replace an entity. Returns true if it was stored.
    fn save(&self, entity: &Entity) -> Result<bool, OrmError>;

    /// Select entities matching the criteria.
    fn select(&self, entity_type: &str, criteria: &Criteria) -> Result<Vec<Entity>, OrmError>;
}

/// An entity type declared by a model: its name and key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDef {
    pub entity_type: String,
    pub key_field: String,
}

impl EntityDef {
    pub fn new(entity_type: impl Into<String>, key_field: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            key_field: key_field.into(),
        }
    }
}

/// In-process ORM keeping entities in concurrent maps.
#[derive(Default)]
pub struct MemoryOrm {
    models: HashMap<String, Vec<EntityDef>>,
    /// entity type -> key field, for every loaded model.
    active: DashMap<String, String>,
    /// entity type -> key -> entity.
    rows: DashMap<String, IndexMap<String, Entity>>,
}

impl MemoryOrm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a model; its types become usable after `load_model`.
    pub fn with_model(mut self, name: impl Into<String>, entities: Vec<EntityDef>) -> Self {
        self.models.insert(name.into(), entities);
        self
    }

    /// Number of stored entities of a type.
    pub fn count(&self, entity_type: &str) -> usize {
        self.rows.get(entity_type).map(|r| r.len()).unwrap_or(0)
    }

    fn key_field(&self, entity_type: &str) -> Result<String, OrmError> {
        self.active
            .get(entity_type)
            .map(|f| f.value().clone())
            .ok_or_else(|| OrmError::UnknownEntityType(entity_type.to_string()))
    }
}

impl Orm for MemoryOrm {
    fn load_model(&self, model: &str) -> Result<(), OrmError> {
        let entities = self
            .models
            .get(model)
            .ok_or_else(|| OrmError::UnknownModel(model.to_string()))?;
        for def in entities {
            self.active.insert(def.entity_type.clone(), def.key_field.clone());
        }
        tracing::debug!(model = %model, entity_types = entities.len(), "Model loaded");
        Ok(())
    }

    fn load(&self, entity_type: &str, key: &str) -> Result<Lookup<Entity>, OrmError> {
        self.key_field(entity_type)?;
        let found = self
            .rows
            .get(entity_type)
            .and_then(|rows| rows.get(key).cloned());
        Ok(match found {
            Some(entity) => Lookup::Found(entity),
            None => Lookup::NotFound,
        })
    }

    fn save(&self, entity: &Entity) -> Result<bool, OrmError> {
        let key_field = self.key_field(entity.entity_type())?;
        let key = match entity.get(&key_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Int(n)) => n.to_string(),
            _ => {
                return Err(OrmError::MissingKey {
                    entity_type: entity.entity_type().to_string(),
                    field: key_field,
                })
            }
        };
        self.rows
            .entry(entity.entity_type().to_string())
            .or_default()
            .insert(key, entity.clone());
        Ok(true)
    }

    fn select(&self, entity_type: &str, criteria: &Criteria) -> Result<Vec<Entity>, OrmError> {
        self.key_field(entity_type)?;
        let mut out: Vec<Entity> = self
            .rows
            .get(entity_type)
            .map(|rows| rows.values().filter(|e| criteria.matches(e)).cloned().collect())
            .unwrap_or_default();

        if let Some((field, order)) = &criteria.order_by {
            out.sort_by(|a, b| {
                let ord = compare_values(a.get(field), b.get(field));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = criteria.limit {
            out.truncate(limit);
        }
        Ok(out)
    }
}

/// Order scalars of the same kind; anything else compares equal, absent sorts first.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Int(x)), Some(Value::Int(y))) => x.cmp(y),
        (Some(Value::Float(x)), Some(Value::Float(y))) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
