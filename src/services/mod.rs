//! Collaborators consumed by controller bodies.
//!
//! The dispatch core never calls these itself; it only hands them to
//! components through [`Services`].

pub mod orm;
pub mod template;

use std::sync::Arc;

use crate::services::orm::Orm;
use crate::services::template::Renderer;

/// Shared handles passed to component `init` and controller operations.
#[derive(Clone)]
pub struct Services {
    pub orm: Arc<dyn Orm>,
    pub renderer: Arc<dyn Renderer>,
}

impl Services {
    pub fn new(orm: Arc<dyn Orm>, renderer: Arc<dyn Renderer>) -> Self {
        Self { orm, renderer }
    }
}
