//! JSON exporter for offline visualization.
//!
//! Records, per tick, where entities really are and what the camera sees.

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use warp_core::{EntityId, Position, Snapshot, Universe};

/// Position of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityPosition {
    /// Entity identifier
    pub id: u64,

    /// Registered kind name
    pub kind: String,

    /// X coordinate in world units
    pub x: f64,

    /// Y coordinate in world units
    pub y: f64,
}

impl EntityPosition {
    /// Creates a position record for entity `id` of `kind`.
    pub fn new(id: EntityId, kind: &str, pos: Position) -> Self {
        Self {
            id: id.as_u64(),
            kind: kind.to_string(),
            x: pos.x,
            y: pos.y,
        }
    }

    fn from_snapshot(id: EntityId, snapshot: &Snapshot) -> Self {
        Self::new(id, snapshot.kind(), snapshot.position())
    }
}

/// A single tick of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Tick of the newest frame
    pub tick: u64,

    /// Live entity positions
    pub live: Vec<EntityPosition>,

    /// Positions as seen from the camera
    pub observed: Vec<EntityPosition>,
}

impl SimFrame {
    /// Captures the universe state after an update, observed from `camera`.
    ///
    /// Returns `None` before the first update.
    pub fn capture(universe: &Universe, camera: Position) -> Option<Self> {
        let tick = universe.current_tick()?;

        let live = universe
            .live_ids()
            .filter_map(|id| universe.entity(id))
            .map(|e| EntityPosition::new(e.id(), e.kind(), e.position()))
            .collect();

        let observed = universe
            .observe_from(camera)
            .map(|(id, snapshot)| EntityPosition::from_snapshot(id, &snapshot))
            .collect();

        Some(Self {
            tick,
            live,
            observed,
        })
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// History capacity in frames
    pub capacity: usize,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, capacity: usize) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            capacity,
            frames: Vec::new(),
            passed: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Reads an export back from disk.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{register_builtin_kinds, spawn_probe};
    use tempfile::NamedTempFile;
    use warp_core::{Owner, UniverseConfig};

    #[test]
    fn test_capture_live_and_observed() {
        let mut universe = Universe::new(UniverseConfig::default()).unwrap();
        register_builtin_kinds(universe.registry_mut());
        assert!(SimFrame::capture(&universe, Position::zeros()).is_none());

        spawn_probe(&mut universe, Owner::Enemy, Position::new(4.0, 0.0), Position::zeros(), None)
            .unwrap();
        universe.update().unwrap();

        // Tick 0: the probe is live but its light needs 8 ticks to arrive.
        let frame = SimFrame::capture(&universe, Position::zeros()).unwrap();
        assert_eq!(frame.tick, 0);
        assert_eq!(frame.live.len(), 1);
        assert_eq!(frame.live[0].kind, "probe");
        assert!(frame.observed.is_empty());

        for _ in 0..8 {
            universe.update().unwrap();
        }
        let frame = SimFrame::capture(&universe, Position::zeros()).unwrap();
        assert_eq!(frame.tick, 8);
        assert_eq!(frame.observed.len(), 1);
        assert_eq!(frame.observed[0], frame.live[0]);
    }

    #[test]
    fn test_write_and_read_back() {
        let mut export = SimExport::new("ghosts", 7, 20);
        export.add_frame(SimFrame {
            tick: 0,
            live: vec![EntityPosition::new(EntityId(3), "probe", Position::new(1.0, 2.0))],
            observed: vec![],
        });
        export.finalize(true);

        let file = NamedTempFile::new().unwrap();
        export.write_to_file(file.path()).unwrap();
        let loaded = SimExport::read_from_file(file.path()).unwrap();

        assert_eq!(loaded.scenario, "ghosts");
        assert_eq!(loaded.capacity, 20);
        assert!(loaded.passed);
        assert_eq!(loaded.frames[0].live[0], export.frames[0].live[0]);
    }
}
