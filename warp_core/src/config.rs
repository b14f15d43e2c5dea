//! Universe sizing configuration.
//!
//! The history buffer is sized once, from the universe radius, the signal
//! propagation speed and the tick rate, so that it covers the longest delay
//! any observer inside the universe can experience.

use crate::entity::Position;
use crate::error::{Result, WarpError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Largest history buffer a configuration may ask for, in frames.
pub const MAX_CAPACITY: usize = 1 << 20;

/// Axis-aligned world bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum x coordinate
    pub min_x: f64,
    /// Minimum y coordinate
    pub min_y: f64,
    /// Maximum x coordinate
    pub max_x: f64,
    /// Maximum y coordinate
    pub max_y: f64,
}

impl Bounds {
    /// Square bounds centred on the origin.
    pub fn centered(half_extent: f64) -> Self {
        Self {
            min_x: -half_extent,
            min_y: -half_extent,
            max_x: half_extent,
            max_y: half_extent,
        }
    }

    /// Returns true if every edge is finite and the box is not inverted.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Returns true if `position` lies inside (edges included).
    pub fn contains(&self, position: Position) -> bool {
        position.x >= self.min_x
            && position.x <= self.max_x
            && position.y >= self.min_y
            && position.y <= self.max_y
    }
}

/// Configuration for a [`Universe`](crate::universe::Universe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseConfig {
    /// Universe radius in world units
    pub radius: f64,

    /// Signal propagation speed in world units per second
    pub propagation_speed: f64,

    /// Simulation tick rate in Hz
    pub ticks_per_second: f64,

    /// Size the buffer for a round trip (`2R`) rather than one way (`R`)
    pub round_trip: bool,

    /// Default observer position handed to behaviour hooks
    pub camera: [f64; 2],

    /// World bounds handed to behaviour hooks
    pub bounds: Bounds,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            radius: 5.0,
            propagation_speed: 1.0,
            ticks_per_second: 2.0,
            round_trip: true,
            camera: [0.0, 0.0],
            bounds: Bounds::centered(5.0),
        }
    }
}

impl UniverseConfig {
    /// Creates a round-trip configuration with bounds matching `radius`.
    pub fn new(radius: f64, propagation_speed: f64, ticks_per_second: f64) -> Self {
        Self {
            radius,
            propagation_speed,
            ticks_per_second,
            bounds: Bounds::centered(radius),
            ..Default::default()
        }
    }

    /// Sizes the buffer for one-way travel only.
    pub fn one_way(mut self) -> Self {
        self.round_trip = false;
        self
    }

    /// Sets the default camera position.
    pub fn with_camera(mut self, camera: Position) -> Self {
        self.camera = [camera.x, camera.y];
        self
    }

    /// Camera position as a vector.
    pub fn camera_position(&self) -> Position {
        Position::new(self.camera[0], self.camera[1])
    }

    /// Distance the buffer has to cover.
    pub fn span(&self) -> f64 {
        if self.round_trip {
            2.0 * self.radius
        } else {
            self.radius
        }
    }

    /// Checks every sizing parameter is finite and positive and the bounds
    /// describe a finite box.
    pub fn validate(&self) -> Result<()> {
        check_positive("radius", self.radius)?;
        check_positive("propagation_speed", self.propagation_speed)?;
        check_positive("ticks_per_second", self.ticks_per_second)?;
        if !self.bounds.is_valid() {
            return Err(WarpError::invalid(format!("invalid bounds {:?}", self.bounds)));
        }
        Ok(())
    }

    /// Number of frames needed to cover the configured span:
    /// `ceil(span / propagation_speed * ticks_per_second)`.
    pub fn capacity(&self) -> Result<usize> {
        self.validate()?;

        let frames = (self.span() / self.propagation_speed * self.ticks_per_second).ceil();
        if !frames.is_finite() || frames > MAX_CAPACITY as f64 {
            return Err(WarpError::invalid(format!(
                "history of {} frames exceeds the limit of {}",
                frames, MAX_CAPACITY
            )));
        }

        // A positive span always needs at least one frame.
        Ok((frames as usize).max(1))
    }

    /// Parses a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| WarpError::invalid(format!("malformed config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WarpError::invalid(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(WarpError::invalid(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}
