//! Probe: a constant-velocity mover with a finite lifetime.

use std::any::Any;
use warp_core::{
    DamageType, DrawContext, Entity, EntityError, EntityId, Owner, Position, RenderError, Rgba,
    TickContext,
};

/// Registered kind name.
pub const KIND: &str = "probe";

/// Lifetime given to probes built by the registry factory.
pub const DEFAULT_LIFETIME_TICKS: u64 = 60;

/// Radius of the rendered marker.
pub const RENDER_RADIUS: f64 = 0.25;

const COLOR: Rgba = Rgba::new(0, 128, 255, 255);

/// Small, fragile mover that expires after a fixed number of ticks.
#[derive(Debug, Clone)]
pub struct Probe {
    id: EntityId,
    owner: Owner,
    hp: f64,
    age: u64,

    /// Current position
    pub position: Position,

    /// Velocity in world units per second
    pub velocity: Position,

    /// Ticks until the probe expires, `None` for no expiry
    pub lifetime: Option<u64>,
}

impl Probe {
    /// Creates a stationary probe at the origin with the default lifetime.
    pub fn new(id: EntityId, owner: Owner) -> Self {
        Self {
            id,
            owner,
            hp: 1.0,
            age: 0,
            position: Position::zeros(),
            velocity: Position::zeros(),
            lifetime: Some(DEFAULT_LIFETIME_TICKS),
        }
    }

    /// Number of updates this probe has been through.
    pub fn age(&self) -> u64 {
        self.age
    }

    /// Ticks left before expiry.
    pub fn remaining(&self) -> Option<u64> {
        self.lifetime.map(|l| l.saturating_sub(self.age))
    }
}

impl Entity for Probe {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> &str {
        KIND
    }

    fn owner(&self) -> Owner {
        self.owner
    }

    fn position(&self) -> Position {
        self.position
    }

    fn alive(&self) -> bool {
        self.hp > 0.0 && self.lifetime.map_or(true, |l| self.age < l)
    }

    fn take_fire(&mut self, damage: f64, _ty: DamageType) -> bool {
        self.hp -= damage;
        self.alive()
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EntityError> {
        self.position += self.velocity * ctx.view().dt();
        self.age += 1;
        Ok(())
    }

    fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), RenderError> {
        ctx.begin_path();
        ctx.set_fill_color(COLOR);
        ctx.circle(self.position.x, self.position.y, RENDER_RADIUS);
        ctx.fill();
        Ok(())
    }

    fn snapshot(&self) -> Box<dyn Entity> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use warp_core::{Universe, UniverseConfig};

    fn probe_universe() -> Universe {
        let mut universe = Universe::new(UniverseConfig::default()).unwrap();
        universe.register(KIND, |id, owner| Box::new(Probe::new(id, owner)));
        universe
    }

    fn probe_mut(universe: &mut Universe, id: EntityId) -> &mut Probe {
        universe
            .entity_mut(id)
            .and_then(|e| e.as_any_mut().downcast_mut::<Probe>())
            .unwrap()
    }

    #[test]
    fn test_moves_with_velocity() {
        let mut universe = probe_universe();
        let id = universe.spawn(KIND, Owner::Player).unwrap();
        probe_mut(&mut universe, id).velocity = Position::new(1.0, -2.0);

        // 2 Hz: half a second per tick
        universe.update().unwrap();
        universe.update().unwrap();

        let probe = probe_mut(&mut universe, id);
        assert_relative_eq!(probe.position.x, 1.0);
        assert_relative_eq!(probe.position.y, -2.0);
        assert_eq!(probe.age(), 2);
    }

    #[test]
    fn test_expires_after_lifetime() {
        let mut universe = probe_universe();
        let id = universe.spawn(KIND, Owner::Enemy).unwrap();
        probe_mut(&mut universe, id).lifetime = Some(3);

        universe.update().unwrap();
        universe.update().unwrap();
        assert_eq!(probe_mut(&mut universe, id).remaining(), Some(1));

        // Third update ages it out; it is removed in the same tick.
        universe.update().unwrap();
        assert!(universe.entity(id).is_none());
        assert!(universe.history().frame_at(1).unwrap().contains(id));
        assert!(!universe.history().frame_at(2).unwrap().contains(id));
    }

    #[test]
    fn test_unbounded_lifetime() {
        let mut probe = Probe::new(EntityId::next(), Owner::Team);
        probe.lifetime = None;
        probe.age = u64::MAX;
        assert!(probe.alive());
        assert_eq!(probe.remaining(), None);
    }

    #[test]
    fn test_single_hit_destroys() {
        let mut probe = Probe::new(EntityId::next(), Owner::Enemy);
        assert!(!probe.take_fire(1.0, DamageType::Laser));
    }
}
