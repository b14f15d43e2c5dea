//! Entity kind registry.
//!
//! Maps kind names to factories. The registry is an ordinary value owned by
//! the [`Universe`](crate::universe::Universe); registering a kind is an
//! explicit call, there is no process-wide table.

use crate::entity::{Entity, EntityId, Owner};
use crate::error::{Result, WarpError};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Builds a new entity of one kind from its id and owner.
pub type EntityFactory = Box<dyn Fn(EntityId, Owner) -> Box<dyn Entity> + Send + Sync>;

/// Registry of entity factories keyed by kind name.
#[derive(Default)]
pub struct EntityRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the factory for `kind`.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(EntityId, Owner) -> Box<dyn Entity> + Send + Sync + 'static,
    {
        if self.factories.insert(kind.to_string(), Box::new(factory)).is_some() {
            debug!("Replaced factory for kind '{}'", kind);
        } else {
            debug!("Registered kind '{}'", kind);
        }
    }

    /// Returns true if `kind` has a factory.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Builds an entity of `kind`.
    pub fn create(&self, kind: &str, id: EntityId, owner: Owner) -> Result<Box<dyn Entity>> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| WarpError::unknown_kind(kind))?;
        Ok(factory(id, owner))
    }

    /// Registered kind names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
