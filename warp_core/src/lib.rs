//! Warp Core - Finite-Speed Observation for Simulated Universes
//!
//! Entities in a warp universe are never seen as they are *now*. Every
//! observer sees each entity as it was when a signal travelling at finite
//! speed left it:
//! 1. **History**: one immutable [`Frame`] per tick, kept in a [`RingBuffer`]
//!    sized to cover the longest signal delay inside the universe
//! 2. **Controller**: [`Universe`] runs entity behaviour and captures frames
//! 3. **Observation**: [`Universe::observe`] resolves per-entity delays
//!    against the history

pub mod config;
pub mod entity;
pub mod error;
pub mod frame;
pub mod observe;
pub mod registry;
pub mod render;
pub mod ring_buffer;
pub mod universe;

// Re-export key types for convenience
pub use config::{Bounds, UniverseConfig, MAX_CAPACITY};
pub use entity::{DamageType, Entity, EntityError, EntityId, Owner, Position};
pub use error::{Result, WarpError};
pub use frame::{Frame, Snapshot};
pub use observe::{delay_ticks, target_tick, Observation, Observer, TargetTick};
pub use registry::{EntityFactory, EntityRegistry};
pub use render::{render_observation, DrawCommand, DrawContext, DrawList, RenderError, Rgba};
pub use ring_buffer::RingBuffer;
pub use universe::{TickContext, TickReport, Universe, WorldView};

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal entity kind used by the unit tests.

    use crate::config::UniverseConfig;
    use crate::entity::{DamageType, Entity, EntityError, EntityId, Owner, Position};
    use crate::render::{DrawContext, RenderError, Rgba};
    use crate::universe::{TickContext, Universe};
    use std::any::Any;

    #[derive(Debug, Clone)]
    pub struct Beacon {
        pub id: EntityId,
        pub owner: Owner,
        pub position: Position,
        pub velocity: Position,
        pub hp: f64,
        pub updates: u64,
        pub neighbours: usize,
        pub fail_at_tick: Option<u64>,
        pub spawn_kind: Option<String>,
        pub broken_render: bool,
    }

    impl Beacon {
        pub fn new(id: EntityId, owner: Owner) -> Self {
            Self {
                id,
                owner,
                position: Position::zeros(),
                velocity: Position::zeros(),
                hp: 10.0,
                updates: 0,
                neighbours: 0,
                fail_at_tick: None,
                spawn_kind: None,
                broken_render: false,
            }
        }

        pub fn at(id: EntityId, owner: Owner, x: f64, y: f64) -> Self {
            Self {
                position: Position::new(x, y),
                ..Self::new(id, owner)
            }
        }
    }

    impl Entity for Beacon {
        fn id(&self) -> EntityId {
            self.id
        }

        fn kind(&self) -> &str {
            "beacon"
        }

        fn owner(&self) -> Owner {
            self.owner
        }

        fn position(&self) -> Position {
            self.position
        }

        fn alive(&self) -> bool {
            self.hp > 0.0
        }

        fn take_fire(&mut self, damage: f64, _ty: DamageType) -> bool {
            self.hp -= damage;
            self.alive()
        }

        fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EntityError> {
            if self.fail_at_tick == Some(ctx.view().tick()) {
                return Err(EntityError::behaviour("beacon fault"));
            }
            self.updates += 1;
            self.neighbours = ctx.view().find_all(self.position, 1.0e9, None).len();
            self.position += self.velocity;
            if let Some(kind) = self.spawn_kind.take() {
                ctx.spawn(&kind, self.owner)?;
            }
            Ok(())
        }

        fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), RenderError> {
            if self.broken_render {
                return Err(RenderError::Backend("beacon cannot draw".to_string()));
            }
            ctx.begin_path();
            ctx.set_fill_color(Rgba::new(255, 255, 255, 255));
            ctx.circle(self.position.x, self.position.y, 1.0);
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

    /// Default configuration (capacity 20) with the beacon kind registered.
    pub fn beacon_universe() -> Universe {
        let mut universe = Universe::new(UniverseConfig::default()).unwrap();
        universe.register("beacon", |id, owner| Box::new(Beacon::new(id, owner)));
        universe
    }
}
