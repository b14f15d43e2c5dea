//! Mothership: the heavy capital ship.

use std::any::Any;
use warp_core::{
    DamageType, DrawContext, Entity, EntityError, EntityId, Owner, Position, RenderError, Rgba,
    TickContext,
};

use super::probe;

/// Registered kind name.
pub const KIND: &str = "mothership";

/// Hit points at spawn.
pub const MAX_HP: f64 = 100.0;

/// Radius of the rendered hull.
pub const RENDER_RADIUS: f64 = 1000.0;

const COLOR: Rgba = Rgba::new(255, 0, 0, 255);

/// Capital ship. Stationary unless given a velocity; optionally launches
/// probes on a fixed cadence.
#[derive(Debug, Clone)]
pub struct Mothership {
    id: EntityId,
    owner: Owner,
    hp: f64,
    launched: u64,

    /// Current position
    pub position: Position,

    /// Velocity in world units per second
    pub velocity: Position,

    /// Launch one probe every this many ticks
    pub launch_every: Option<u64>,
}

impl Mothership {
    /// Creates a full-health mothership at the origin.
    pub fn new(id: EntityId, owner: Owner) -> Self {
        Self {
            id,
            owner,
            hp: MAX_HP,
            launched: 0,
            position: Position::zeros(),
            velocity: Position::zeros(),
            launch_every: None,
        }
    }

    /// Remaining hit points.
    pub fn hp(&self) -> f64 {
        self.hp
    }

    /// Probes launched so far.
    pub fn launched(&self) -> u64 {
        self.launched
    }
}

impl Entity for Mothership {
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
        self.hp > 0.0
    }

    fn take_fire(&mut self, damage: f64, _ty: DamageType) -> bool {
        self.hp -= damage;
        self.alive()
    }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> Result<(), EntityError> {
        self.position += self.velocity * ctx.view().dt();

        if let Some(every) = self.launch_every.filter(|n| *n > 0) {
            if ctx.view().tick() % every == 0 {
                ctx.spawn(probe::KIND, self.owner)?;
                self.launched += 1;
            }
        }
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
