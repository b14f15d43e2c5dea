//! Render-side interface.
//!
//! The core never draws anything itself. Entity kinds draw their snapshots
//! through a [`DrawContext`] supplied by the rendering backend; [`DrawList`]
//! is an in-memory backend that records the calls.

use crate::entity::EntityId;
use crate::error::{Result, WarpError};
use crate::frame::Snapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Creates a color from its components.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Errors a render hook may report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The drawing backend rejected a call
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Vector drawing calls available to render hooks.
pub trait DrawContext {
    /// Starts a new path.
    fn begin_path(&mut self);

    /// Sets the fill color for subsequent fills.
    fn set_fill_color(&mut self, color: Rgba);

    /// Adds a circle to the current path.
    fn circle(&mut self, cx: f64, cy: f64, radius: f64);

    /// Fills the current path.
    fn fill(&mut self);
}

/// A recorded drawing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    BeginPath,
    FillColor { color: Rgba },
    Circle { cx: f64, cy: f64, radius: f64 },
    Fill,
}

/// [`DrawContext`] that records every call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls, in order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Number of `fill` calls recorded.
    pub fn fill_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Fill))
            .count()
    }

    /// Forgets all recorded calls.
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl DrawContext for DrawList {
    fn begin_path(&mut self) {
        self.commands.push(DrawCommand::BeginPath);
    }

    fn set_fill_color(&mut self, color: Rgba) {
        self.commands.push(DrawCommand::FillColor { color });
    }

    fn circle(&mut self, cx: f64, cy: f64, radius: f64) {
        self.commands.push(DrawCommand::Circle { cx, cy, radius });
    }

    fn fill(&mut self) {
        self.commands.push(DrawCommand::Fill);
    }
}

/// Draws every snapshot of an observation, returning how many were drawn.
///
/// Stops at the first failing render hook.
pub fn render_observation<I>(observation: I, ctx: &mut dyn DrawContext) -> Result<usize>
where
    I: IntoIterator<Item = (EntityId, Snapshot)>,
{
    let mut drawn = 0;
    for (id, snapshot) in observation {
        snapshot
            .render(ctx)
            .map_err(|source| WarpError::Render { id, source })?;
        drawn += 1;
    }
    Ok(drawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Owner};
    use crate::test_support::Beacon;

    #[test]
    fn test_draw_list_records() {
        let beacon = Beacon::at(EntityId::next(), Owner::Player, 2.0, 3.0);
        let mut list = DrawList::new();
        beacon.render(&mut list).unwrap();

        assert_eq!(list.commands().len(), 4);
        assert_eq!(list.commands()[0], DrawCommand::BeginPath);
        assert_eq!(
            list.commands()[2],
            DrawCommand::Circle { cx: 2.0, cy: 3.0, radius: 1.0 }
        );
        assert_eq!(list.fill_count(), 1);
    }

    #[test]
    fn test_render_observation() {
        let a = Beacon::at(EntityId::next(), Owner::Player, 0.0, 0.0);
        let b = Beacon::at(EntityId::next(), Owner::Team, 1.0, 0.0);
        let observed = vec![
            (a.id, Snapshot::capture(&a)),
            (b.id, Snapshot::capture(&b)),
        ];

        let mut list = DrawList::new();
        let drawn = render_observation(observed, &mut list).unwrap();

        assert_eq!(drawn, 2);
        assert_eq!(list.fill_count(), 2);
    }

    #[test]
    fn test_render_failure_reports_entity() {
        let mut broken = Beacon::at(EntityId::next(), Owner::Enemy, 0.0, 0.0);
        broken.broken_render = true;
        let id = broken.id;

        let mut list = DrawList::new();
        let result = render_observation(vec![(id, Snapshot::capture(&broken))], &mut list);

        assert!(matches!(result, Err(WarpError::Render { id: failed, .. }) if failed == id));
    }

    #[test]
    fn test_draw_command_json() {
        let json = serde_json::to_string(&DrawCommand::Circle { cx: 1.0, cy: 2.0, radius: 3.0 }).unwrap();
        assert_eq!(json, r#"{"op":"circle","cx":1.0,"cy":2.0,"radius":3.0}"#);
    }
}
