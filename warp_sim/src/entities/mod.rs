//! Built-in entity kinds.

pub mod mothership;
pub mod probe;

pub use mothership::Mothership;
pub use probe::Probe;

use crate::error::SimError;
use tracing::debug;
use warp_core::{EntityId, EntityRegistry, Owner, Position, Universe};

/// Registers every built-in kind with `registry`.
pub fn register_builtin_kinds(registry: &mut EntityRegistry) {
    registry.register(mothership::KIND, |id, owner| {
        Box::new(Mothership::new(id, owner))
    });
    registry.register(probe::KIND, |id, owner| Box::new(Probe::new(id, owner)));
    debug!("Registered built-in kinds: {:?}", registry.kinds());
}

/// Live entity `id` downcast to its concrete kind.
pub fn concrete_mut<'a, T: 'static>(
    universe: &'a mut Universe,
    id: EntityId,
    expected: &'static str,
) -> Result<&'a mut T, SimError> {
    universe
        .entity_mut(id)
        .and_then(|e| e.as_any_mut().downcast_mut::<T>())
        .ok_or(SimError::KindMismatch { id, expected })
}

/// Spawns a probe with the given kinematics.
pub fn spawn_probe(
    universe: &mut Universe,
    owner: Owner,
    position: Position,
    velocity: Position,
    lifetime: Option<u64>,
) -> Result<EntityId, SimError> {
    let id = universe.spawn(probe::KIND, owner)?;
    let spawned = concrete_mut::<Probe>(universe, id, probe::KIND)?;
    spawned.position = position;
    spawned.velocity = velocity;
    spawned.lifetime = lifetime;
    Ok(id)
}

/// Spawns a stationary mothership at `position`.
pub fn spawn_mothership(
    universe: &mut Universe,
    owner: Owner,
    position: Position,
) -> Result<EntityId, SimError> {
    let id = universe.spawn(mothership::KIND, owner)?;
    concrete_mut::<Mothership>(universe, id, mothership::KIND)?.position = position;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp_core::UniverseConfig;

    #[test]
    fn test_builtin_kinds() {
        let mut registry = EntityRegistry::new();
        register_builtin_kinds(&mut registry);
        assert_eq!(registry.kinds(), vec!["mothership", "probe"]);
    }

    #[test]
    fn test_spawn_helpers() {
        let mut universe = Universe::new(UniverseConfig::default()).unwrap();
        register_builtin_kinds(universe.registry_mut());

        let ship = spawn_mothership(&mut universe, Owner::Enemy, Position::new(1.0, 1.0)).unwrap();
        let scout = spawn_probe(
            &mut universe,
            Owner::Player,
            Position::new(-1.0, 0.0),
            Position::new(0.0, 1.0),
            None,
        )
        .unwrap();

        assert_eq!(universe.entity(ship).unwrap().kind(), "mothership");
        assert_eq!(universe.entity(scout).unwrap().position(), Position::new(-1.0, 0.0));

        let mismatch = concrete_mut::<Probe>(&mut universe, ship, probe::KIND);
        assert!(matches!(mismatch, Err(SimError::KindMismatch { .. })));
    }
}
