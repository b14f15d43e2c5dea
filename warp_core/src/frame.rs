//! Snapshots and frames.
//!
//! A [`Snapshot`] is a detached, immutable copy of one entity at one tick.
//! A [`Frame`] holds the snapshots of every entity alive when it was captured.

use crate::entity::{Entity, EntityId, Owner, Position};
use crate::render::{DrawContext, RenderError};
use std::collections::{btree_map, BTreeMap};
use std::sync::Arc;

/// Immutable copy of one entity's observable state.
///
/// Cloning a snapshot is cheap and shares the same captured state.
#[derive(Debug, Clone)]
pub struct Snapshot(Arc<dyn Entity>);

impl Snapshot {
    /// Captures the current state of `entity`.
    pub fn capture(entity: &dyn Entity) -> Self {
        Self(Arc::from(entity.snapshot()))
    }

    /// Id of the captured entity.
    pub fn id(&self) -> EntityId {
        self.0.id()
    }

    /// Kind name of the captured entity.
    pub fn kind(&self) -> &str {
        self.0.kind()
    }

    /// Owner of the captured entity.
    pub fn owner(&self) -> Owner {
        self.0.owner()
    }

    /// Position at capture time.
    pub fn position(&self) -> Position {
        self.0.position()
    }

    /// Whether the entity was alive at capture time.
    pub fn alive(&self) -> bool {
        self.0.alive()
    }

    /// Draws the captured state.
    pub fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), RenderError> {
        self.0.render(ctx)
    }

    /// Downcasts the captured state to a concrete entity type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }

    /// Returns true if both handles point at the same capture.
    pub fn ptr_eq(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// All entity snapshots taken at one simulation tick.
#[derive(Debug, Clone)]
pub struct Frame {
    tick: u64,
    entities: BTreeMap<EntityId, Snapshot>,
}

impl Frame {
    /// Captures every entity in `entities` at `tick`.
    pub fn capture<'a, I, E>(tick: u64, entities: I) -> Self
    where
        I: IntoIterator<Item = &'a E>,
        E: Entity + ?Sized + 'a,
    {
        let snapshots = entities
            .into_iter()
            .map(|entity| Snapshot(Arc::from(entity.snapshot())));
        Self::from_snapshots(tick, snapshots)
    }

    /// Builds a frame from already captured snapshots.
    ///
    /// A later snapshot with the same id replaces an earlier one.
    pub fn from_snapshots<I>(tick: u64, snapshots: I) -> Self
    where
        I: IntoIterator<Item = Snapshot>,
    {
        let entities = snapshots.into_iter().map(|s| (s.id(), s)).collect();
        Self { tick, entities }
    }

    /// Tick this frame was captured at.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Snapshot of `id`, if the entity existed at this tick.
    pub fn get(&self, id: EntityId) -> Option<&Snapshot> {
        self.entities.get(&id)
    }

    /// Returns true if `id` existed at this tick.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities captured.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if no entity was alive at this tick.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Snapshots in id order.
    pub fn iter(&self) -> FrameIter<'_> {
        FrameIter(self.entities.iter())
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Linear scan for snapshots within `radius` of `center`, optionally
    /// restricted to one owner.
    pub fn find_all(
        &self,
        center: Position,
        radius: f64,
        owner: Option<Owner>,
    ) -> impl Iterator<Item = &Snapshot> + '_ {
        self.entities.values().filter(move |s| {
            owner.map_or(true, |o| s.owner() == o) && (s.position() - center).norm() <= radius
        })
    }
}

/// Iterator over a frame's snapshots in id order.
#[derive(Debug, Clone)]
pub struct FrameIter<'a>(btree_map::Iter<'a, EntityId, Snapshot>);

impl<'a> Iterator for FrameIter<'a> {
    type Item = (EntityId, &'a Snapshot);

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(id, snapshot)| (*id, snapshot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Beacon;
    use approx::assert_relative_eq;

    #[test]
    fn test_capture_is_detached() {
        let mut beacon = Beacon::at(EntityId::next(), Owner::Player, 1.0, 2.0);
        let snapshot = Snapshot::capture(&beacon);

        beacon.position.x = 100.0;
        beacon.hp = 0.0;

        assert_relative_eq!(snapshot.position().x, 1.0);
        assert!(snapshot.alive());
        assert_relative_eq!(snapshot.downcast_ref::<Beacon>().unwrap().hp, 10.0);
    }

    #[test]
    fn test_frame_lookup() {
        let a = Beacon::at(EntityId::next(), Owner::Player, 0.0, 0.0);
        let b = Beacon::at(EntityId::next(), Owner::Enemy, 3.0, 4.0);
        let frame = Frame::capture(7, [&a as &dyn Entity, &b as &dyn Entity]);

        assert_eq!(frame.tick(), 7);
        assert_eq!(frame.len(), 2);
        assert!(frame.contains(a.id));
        assert!(frame.contains(b.id));
        assert!(!frame.contains(EntityId(0)));
        assert_eq!(frame.ids().collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[test]
    fn test_find_all() {
        let near = Beacon::at(EntityId::next(), Owner::Player, 1.0, 0.0);
        let far = Beacon::at(EntityId::next(), Owner::Player, 10.0, 0.0);
        let enemy = Beacon::at(EntityId::next(), Owner::Enemy, 0.0, 1.0);
        let frame = Frame::capture(
            0,
            [&near as &dyn Entity, &far as &dyn Entity, &enemy as &dyn Entity],
        );

        let all: Vec<EntityId> = frame
            .find_all(Position::zeros(), 5.0, None)
            .map(Snapshot::id)
            .collect();
        assert_eq!(all, vec![near.id, enemy.id]);

        let players: Vec<EntityId> = frame
            .find_all(Position::zeros(), 5.0, Some(Owner::Player))
            .map(Snapshot::id)
            .collect();
        assert_eq!(players, vec![near.id]);
    }
}
