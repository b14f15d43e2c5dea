//! Error types for the Warp observation core.

use crate::entity::{EntityError, EntityId};
use crate::render::RenderError;
use thiserror::Error;

/// Errors raised by the universe controller and its history buffer.
///
/// Missing history or a missing entity in a historical frame is *not* an
/// error: observation queries silently omit such entities.
#[derive(Debug, Error)]
pub enum WarpError {
    /// Non-positive radius, speed, tick rate or capacity at construction.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Spawn request for a kind that was never registered.
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    /// An entity behaviour hook failed; the rest of the tick was aborted.
    #[error("Entity {id} failed to update: {source}")]
    EntityUpdateFailure {
        /// Entity whose hook failed
        id: EntityId,
        /// Error reported by the hook
        #[source]
        source: EntityError,
    },

    /// A frame was pushed with a tick not newer than the latest stored one.
    #[error("Frame for tick {tick} pushed after tick {latest}")]
    FrameOutOfOrder {
        /// Tick of the rejected frame
        tick: u64,
        /// Latest tick already stored
        latest: u64,
    },

    /// A render hook failed while drawing an observed snapshot.
    #[error("Entity {id} failed to render: {source}")]
    Render {
        /// Entity whose snapshot failed to draw
        id: EntityId,
        /// Error reported by the render hook
        #[source]
        source: RenderError,
    },
}

impl WarpError {
    /// Creates an invalid configuration error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates an unknown kind error.
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownEntityKind(kind.into())
    }
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, WarpError>;
