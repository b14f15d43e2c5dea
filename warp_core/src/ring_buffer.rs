//! Fixed-capacity wraparound storage of the most recent frames.
//!
//! Frame `t` lives in slot `t mod capacity`. Writing a frame overwrites the
//! slot holding the frame exactly `capacity` ticks older, which is dropped
//! for good: nothing beyond the horizon is recoverable.

use crate::error::{Result, WarpError};
use crate::frame::Frame;
use tracing::trace;

/// Ring buffer of frames indexed by tick.
#[derive(Debug)]
pub struct RingBuffer {
    /// One slot per retained tick
    slots: Vec<Option<Frame>>,

    /// Tick of the most recently pushed frame
    latest: Option<u64>,
}

impl RingBuffer {
    /// Creates an empty buffer with room for `capacity` frames.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(WarpError::invalid("ring buffer capacity must be positive"));
        }
        let mut slots = Vec::new();
        slots.resize_with(capacity, || None);
        Ok(Self { slots, latest: None })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Tick of the newest stored frame.
    pub fn latest_tick(&self) -> Option<u64> {
        self.latest
    }

    /// Oldest tick inside the retention window `[latest - capacity + 1, latest]`.
    ///
    /// The window may reach further back than the first frame ever pushed;
    /// such ticks are simply unavailable.
    pub fn horizon(&self) -> Option<u64> {
        self.latest
            .map(|latest| latest.saturating_sub(self.capacity() as u64 - 1))
    }

    /// Stores `frame`, evicting whatever occupied its slot.
    ///
    /// Frames must arrive in strictly increasing tick order.
    pub fn push_frame(&mut self, frame: Frame) -> Result<()> {
        let tick = frame.tick();
        if let Some(latest) = self.latest {
            if tick <= latest {
                return Err(WarpError::FrameOutOfOrder { tick, latest });
            }
        }

        let index = self.slot_index(tick);
        if let Some(evicted) = self.slots[index].replace(frame) {
            trace!("Evicted frame {} for frame {}", evicted.tick(), tick);
        }
        self.latest = Some(tick);
        Ok(())
    }

    /// Frame for `tick`, if it is inside the retention window and still stored.
    pub fn frame_at(&self, tick: u64) -> Option<&Frame> {
        let latest = self.latest?;
        let horizon = self.horizon()?;
        if tick > latest || tick < horizon {
            return None;
        }

        self.slots[self.slot_index(tick)]
            .as_ref()
            .filter(|frame| frame.tick() == tick)
    }

    /// The newest frame.
    pub fn latest(&self) -> Option<&Frame> {
        self.latest.and_then(|tick| self.frame_at(tick))
    }

    /// Number of frames currently retrievable.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns true if no frame was ever pushed.
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    /// Retained frames, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> + '_ {
        self.horizon()
            .zip(self.latest)
            .into_iter()
            .flat_map(move |(horizon, latest)| {
                (horizon..=latest).filter_map(move |tick| self.frame_at(tick))
            })
    }

    fn slot_index(&self, tick: u64) -> usize {
        (tick % self.capacity() as u64) as usize
    }
}
