//! Observer query engine.
//!
//! Answers "what does an observer at `P` see right now": every entity is
//! looked up in the frame that is `floor(distance / c * f)` ticks old, so
//! distant entities appear as they were when their signal left them.
//!
//! # Rounding policy
//!
//! Delays are truncated toward zero. A partially elapsed tick of travel time
//! is not yet observable, so an entity at distance `d` is seen exactly
//! `trunc(d / c * f)` ticks in the past.
//!
//! # Horizon clamping
//!
//! The retention window is `[current - capacity + 1, current]`. A target
//! tick below it is clamped to the oldest retained frame: far observers see
//! the oldest available information instead of nothing. A target inside the
//! window that precedes tick 0 is not clamped; the entity is skipped until
//! enough history exists.

use crate::entity::{EntityId, Position};
use crate::frame::{Frame, FrameIter, Snapshot};
use crate::ring_buffer::RingBuffer;
use std::collections::{btree_map, BTreeMap};

/// Signal travel time in whole ticks for `distance`.
///
/// Non-finite or negative results (zero, negative or NaN speed) saturate to
/// `u64::MAX`, which always clamps to the horizon.
pub fn delay_ticks(distance: f64, propagation_speed: f64, ticks_per_second: f64) -> u64 {
    let ticks = distance / propagation_speed * ticks_per_second;
    if ticks.is_nan() || ticks < 0.0 {
        return u64::MAX;
    }
    // `as` saturates, so +inf maps to u64::MAX as well.
    ticks.trunc() as u64
}

/// Result of mapping a delay onto the retained history window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetTick {
    /// Tick to read
    pub tick: u64,

    /// True if the requested tick predated the horizon
    pub clamped: bool,
}

/// Frame tick seen at `delay` ticks before `current` with `capacity` frames retained.
///
/// Returns `None` while the target lies inside the window but before the
/// first frame, i.e. there is not enough history yet.
pub fn target_tick(current: u64, capacity: u64, delay: u64) -> Option<TargetTick> {
    let window_start = i128::from(current) - i128::from(capacity) + 1;
    let wanted = i128::from(current) - i128::from(delay);

    if wanted < window_start {
        // The oldest retained frame is never older than tick 0.
        let tick = u64::try_from(window_start.max(0)).ok()?;
        return Some(TargetTick { tick, clamped: true });
    }
    let tick = u64::try_from(wanted).ok()?;
    Some(TargetTick { tick, clamped: false })
}

/// Last known whereabouts of an entity that left the live set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ghost {
    /// Tick of the last frame the entity appears in
    pub last_tick: u64,

    /// Position in that frame
    pub position: Position,
}

/// Parameters of one observation query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observer {
    /// Where the observer stands
    pub position: Position,

    /// Signal propagation speed (world units per second)
    pub propagation_speed: f64,

    /// Tick rate used to convert travel time into ticks
    pub ticks_per_second: f64,
}

impl Observer {
    /// Delay in ticks for a signal from `source`.
    pub fn delay_to(&self, source: Position) -> u64 {
        delay_ticks(
            (source - self.position).norm(),
            self.propagation_speed,
            self.ticks_per_second,
        )
    }

    /// Frame this observer sees `source` in, given the retained window.
    pub fn lookup<'h>(&self, history: &'h RingBuffer, source: Position) -> Option<&'h Frame> {
        let current = history.latest_tick()?;
        let target = target_tick(current, history.capacity() as u64, self.delay_to(source))?;
        history.frame_at(target.tick)
    }
}

/// Lazy sequence of `(EntityId, Snapshot)` pairs visible to one observer.
///
/// Created by [`Universe::observe`](crate::universe::Universe::observe).
/// Dropping it has no effect; calling `observe` again starts a fresh query.
pub struct Observation<'a> {
    history: &'a RingBuffer,
    observer: Observer,
    live: Option<FrameIter<'a>>,
    ghosts: btree_map::Iter<'a, EntityId, Ghost>,
}

impl<'a> Observation<'a> {
    pub(crate) fn new(
        history: &'a RingBuffer,
        ghosts: &'a BTreeMap<EntityId, Ghost>,
        observer: Observer,
    ) -> Self {
        Self {
            history,
            observer,
            live: history.latest().map(Frame::iter),
            ghosts: ghosts.iter(),
        }
    }

    /// The query parameters.
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    fn next_candidate(&mut self) -> Option<(EntityId, Position)> {
        if let Some(live) = self.live.as_mut() {
            if let Some((id, snapshot)) = live.next() {
                return Some((id, snapshot.position()));
            }
            self.live = None;
        }
        self.ghosts
            .next()
            .map(|(id, ghost)| (*id, ghost.position))
    }
}

impl<'a> Iterator for Observation<'a> {
    type Item = (EntityId, Snapshot);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, position) = self.next_candidate()?;

            // Missing history or an entity missing from the historical frame
            // means "not visible yet", never an error.
            let Some(frame) = self.observer.lookup(self.history, position) else {
                continue;
            };
            if let Some(snapshot) = frame.get(id) {
                return Some((id, snapshot.clone()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_delay_example() {
        // distance 4, c = 1, f = 2
        assert_eq!(delay_ticks(4.0, 1.0, 2.0), 8);
    }

    #[test]
    fn test_delay_truncates() {
        assert_eq!(delay_ticks(4.49, 1.0, 2.0), 8);
        assert_eq!(delay_ticks(0.49, 1.0, 2.0), 0);
        assert_eq!(delay_ticks(0.0, 1.0, 2.0), 0);
    }

    #[test]
    fn test_delay_degenerate_speed() {
        assert_eq!(delay_ticks(1.0, 0.0, 2.0), u64::MAX);
        assert_eq!(delay_ticks(0.0, 0.0, 2.0), u64::MAX);
        assert_eq!(delay_ticks(1.0, -1.0, 2.0), u64::MAX);
        assert_eq!(delay_ticks(1.0, f64::NAN, 2.0), u64::MAX);
        assert_eq!(delay_ticks(f64::INFINITY, 1.0, 2.0), u64::MAX);
    }

    #[test]
    fn test_target_tick_example() {
        // capacity 20, current 50 => window [31, 50]
        let target = target_tick(50, 20, 8);
        assert_eq!(target, Some(TargetTick { tick: 42, clamped: false }));
    }

    #[test]
    fn test_target_tick_clamps_to_horizon() {
        let clamped = Some(TargetTick { tick: 31, clamped: true });
        assert_eq!(target_tick(50, 20, 19), Some(TargetTick { tick: 31, clamped: false }));
        assert_eq!(target_tick(50, 20, 20), clamped);
        assert_eq!(target_tick(50, 20, 1_000), clamped);
        assert_eq!(target_tick(50, 20, u64::MAX), clamped);
    }

    #[test]
    fn test_target_tick_at_startup() {
        // current 3, capacity 20 => window [-16, 3]
        assert_eq!(target_tick(3, 20, 2), Some(TargetTick { tick: 1, clamped: false }));
        assert_eq!(target_tick(3, 20, 3), Some(TargetTick { tick: 0, clamped: false }));

        // Inside the window but before tick 0: not enough history yet.
        assert_eq!(target_tick(3, 20, 4), None);
        assert_eq!(target_tick(3, 20, 8), None);
        assert_eq!(target_tick(3, 20, 19), None);

        // Past the window: clamped to the oldest frame there is.
        assert_eq!(target_tick(3, 20, 20), Some(TargetTick { tick: 0, clamped: true }));
        assert_eq!(target_tick(3, 20, u64::MAX), Some(TargetTick { tick: 0, clamped: true }));
    }

    #[test]
    fn test_lookup_skips_missing_history() {
        let mut history = RingBuffer::new(20).unwrap();
        for tick in 0..=3 {
            history
                .push_frame(Frame::from_snapshots(tick, Vec::<Snapshot>::new()))
                .unwrap();
        }
        let observer = Observer {
            position: Position::zeros(),
            propagation_speed: 1.0,
            ticks_per_second: 2.0,
        };

        assert!(observer.lookup(&history, Position::new(4.0, 0.0)).is_none());
        assert_eq!(
            observer.lookup(&history, Position::new(1.0, 0.0)).map(Frame::tick),
            Some(1)
        );
        assert_eq!(
            observer.lookup(&history, Position::new(50.0, 0.0)).map(Frame::tick),
            Some(0)
        );
    }

    #[test]
    fn test_observer_delay() {
        let observer = Observer {
            position: Position::new(1.0, 1.0),
            propagation_speed: 1.0,
            ticks_per_second: 2.0,
        };
        assert_eq!(observer.delay_to(Position::new(4.0, 5.0)), 10);
    }

    proptest! {
        #[test]
        fn prop_delay_monotonic_in_distance(
            near in 0.0f64..1.0e6,
            extra in 0.0f64..1.0e6,
            speed in 1.0e-3f64..1.0e6,
            rate in 1.0e-3f64..1.0e3,
        ) {
            let far = near + extra;
            prop_assert!(delay_ticks(far, speed, rate) >= delay_ticks(near, speed, rate));
        }

        #[test]
        fn prop_target_within_window(
            current in 0u64..10_000,
            capacity in 1u64..500,
            delay in 0u64..20_000,
        ) {
            let horizon = current.saturating_sub(capacity - 1);
            match target_tick(current, capacity, delay) {
                Some(target) => {
                    prop_assert!(target.tick >= horizon);
                    prop_assert!(target.tick <= current);
                    prop_assert_eq!(target.clamped, delay >= capacity);
                }
                None => prop_assert!(delay > current && delay < capacity),
            }
        }
    }
}
