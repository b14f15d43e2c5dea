//! Entity capability set.
//!
//! The universe controller only ever sees entities through the [`Entity`]
//! trait. Concrete kinds live outside the core and are made available through
//! the [`EntityRegistry`](crate::registry::EntityRegistry).

use crate::render::{DrawContext, RenderError};
use crate::universe::TickContext;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Position in the simulated plane (world units).
pub type Position = Vector2<f64>;

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(1);

/// Unique entity identifier.
///
/// Ids are handed out from a process-wide counter and are never reused,
/// even across universes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Allocates the next unused id.
    pub fn next() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The side an entity was spawned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Owner {
    /// Hostile units
    Enemy,
    /// Units controlled by the local player
    Player,
    /// Units allied with the player
    Team,
}

/// Kind of damage delivered through [`Entity::take_fire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    /// Beam weapons
    Laser,
}

/// Errors an entity behaviour hook may report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// Behaviour-specific failure
    #[error("behaviour failed: {0}")]
    Behaviour(String),

    /// The hook tried to spawn a kind that is not registered
    #[error("cannot spawn unregistered kind '{0}'")]
    UnknownKind(String),
}

impl EntityError {
    /// Creates a behaviour error.
    pub fn behaviour(msg: impl Into<String>) -> Self {
        Self::Behaviour(msg.into())
    }
}

/// The capability set every entity kind implements.
pub trait Entity: Send + Sync + fmt::Debug {
    /// Stable unique id assigned at spawn.
    fn id(&self) -> EntityId;

    /// Name of the registered kind that built this entity.
    fn kind(&self) -> &str;

    /// Side the entity belongs to.
    fn owner(&self) -> Owner;

    /// Current position.
    fn position(&self) -> Position;

    /// `false` once the entity should be removed from the live set.
    fn alive(&self) -> bool;

    /// Applies damage and returns whether the entity is still alive.
    fn take_fire(&mut self, damage: f64, ty: DamageType) -> bool;

    /// Behaviour hook, invoked once per tick while the entity is live.
    fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EntityError>;

    /// Draws the entity. Only ever invoked on snapshots.
    fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), RenderError>;

    /// Produces a fully detached copy sharing no mutable storage with `self`.
    fn snapshot(&self) -> Box<dyn Entity>;

    /// Access to the concrete type for collaborators that know it.
    fn as_any(&self) -> &dyn Any;

    /// Mutable counterpart of [`as_any`](Self::as_any).
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let a = EntityId::next();
        let b = EntityId::next();
        let c = EntityId::next();

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(EntityId(42).to_string(), "#42");
    }

    #[test]
    fn test_owner_serde() {
        let json = serde_json::to_string(&Owner::Player).unwrap();
        assert_eq!(json, "\"player\"");

        let owner: Owner = serde_json::from_str("\"enemy\"").unwrap();
        assert_eq!(owner, Owner::Enemy);
    }
}
