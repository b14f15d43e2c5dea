//! Warp Simulation Harness
//!
//! Drives the observation core through seeded, reproducible scenarios and
//! hosts the built-in entity kinds and the game-state driver.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     ScenarioRunner                       │
//! │   seed ──► ChaCha8Rng ──► spawns, damage, observers      │
//! │                              │                           │
//! │  ┌───────────────────────────▼────────────────────────┐  │
//! │  │ Universe (warp_core)                               │  │
//! │  │   live: Mothership, Probe ──update──► Frame ring   │  │
//! │  └───────────────────────────┬────────────────────────┘  │
//! │                              │ observe                   │
//! │                    checks + ScenarioMetrics              │
//! │                              │                           │
//! │                      SimExport (JSON)                    │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use warp_sim::{ScenarioRunner, scenarios::ScenarioId};
//! use warp_core::UniverseConfig;
//!
//! let runner = ScenarioRunner::new(42, UniverseConfig::default()).with_duration(10.0);
//! let result = runner.run(ScenarioId::Ghosts);
//! assert!(result.passed);
//! ```

pub mod entities;
mod error;
mod exporter;
pub mod game;
mod runner;
pub mod scenarios;

pub use entities::{register_builtin_kinds, Mothership, Probe};
pub use error::SimError;
pub use exporter::{EntityPosition, SimExport, SimFrame};
pub use game::{Game, GameControl, GameState, PlayState};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
