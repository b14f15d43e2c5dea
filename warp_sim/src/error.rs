//! Error types for the Warp simulation harness.

use thiserror::Error;
use warp_core::{EntityId, WarpError};

/// Errors raised by scenarios, the game driver and the exporter.
#[derive(Debug, Error)]
pub enum SimError {
    /// Error from the observation core
    #[error(transparent)]
    Core(#[from] WarpError),

    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// `switch_state` named a state that was never added
    #[error("Invalid state: {0}")]
    UnknownState(String),

    /// `update` or `render` called before any state was entered
    #[error("No active game state")]
    NoActiveState,

    /// A freshly spawned entity was not of the expected concrete kind
    #[error("Entity {id} is not a {expected}")]
    KindMismatch {
        /// Entity that failed to downcast
        id: EntityId,
        /// Kind the caller expected
        expected: &'static str,
    },
}

impl SimError {
    /// Creates an unknown state error.
    pub fn unknown_state(name: impl Into<String>) -> Self {
        Self::UnknownState(name.into())
    }
}
