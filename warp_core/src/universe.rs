//! Universe controller.
//!
//! Owns the live entity registry and the frame history. Each [`Universe::update`]
//! runs every behaviour hook, drops dead entities, then captures the post-update
//! state into a new frame. [`Universe::observe`] answers observer queries from
//! that history and never touches the live registry.
//!
//! # Tick semantics
//!
//! ```text
//!  tick T:  hooks(pre-update set) -> remove dead -> apply queued spawns
//!           -> capture Frame T -> push (evicts Frame T - capacity)
//! ```
//!
//! Hooks see the world through a [`TickContext`]: queries run against the
//! previous frame and spawns are queued, so no entity observes another one
//! half-updated and nothing spawned during tick `T` is updated before `T + 1`.
//!
//! `update` takes `&mut self` and `observe` takes `&self`, so every read of
//! tick `T` has finished before tick `T + 1` can evict anything.

use crate::config::{Bounds, UniverseConfig};
use crate::entity::{Entity, EntityError, EntityId, Owner, Position};
use crate::error::{Result, WarpError};
use crate::frame::{Frame, Snapshot};
use crate::observe::{Ghost, Observation, Observer};
use crate::registry::EntityRegistry;
use crate::ring_buffer::RingBuffer;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Read-only view of the world handed to behaviour hooks.
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    camera: Position,
    bounds: Bounds,
    tick: u64,
    ticks_per_second: f64,
    previous: Option<&'a Frame>,
}

impl<'a> WorldView<'a> {
    /// Current camera / query position.
    pub fn camera_position(&self) -> Position {
        self.camera
    }

    /// World bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Tick being computed.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulation tick rate in Hz.
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f64 {
        1.0 / self.ticks_per_second
    }

    /// The last published frame (state at the end of the previous tick).
    pub fn previous_frame(&self) -> Option<&'a Frame> {
        self.previous
    }

    /// Entities within `radius` of `center` as of the previous tick.
    pub fn find_all(
        &self,
        center: Position,
        radius: f64,
        owner: Option<Owner>,
    ) -> Vec<&'a Snapshot> {
        self.previous
            .map(|frame| frame.find_all(center, radius, owner).collect())
            .unwrap_or_default()
    }
}

/// Per-tick context passed to [`Entity::update`].
pub struct TickContext<'a> {
    view: WorldView<'a>,
    registry: &'a EntityRegistry,
    spawns: Vec<(String, Owner)>,
}

impl<'a> TickContext<'a> {
    fn new(view: WorldView<'a>, registry: &'a EntityRegistry) -> Self {
        Self {
            view,
            registry,
            spawns: Vec::new(),
        }
    }

    /// The read-only world view.
    pub fn view(&self) -> &WorldView<'a> {
        &self.view
    }

    /// Queues a spawn. The new entity joins the live set after every hook
    /// of this tick has run.
    pub fn spawn(&mut self, kind: &str, owner: Owner) -> std::result::Result<(), EntityError> {
        if !self.registry.contains(kind) {
            return Err(EntityError::UnknownKind(kind.to_string()));
        }
        self.spawns.push((kind.to_string(), owner));
        Ok(())
    }

    /// Number of spawns queued so far.
    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }
}

/// Counters for the most recent completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick that was captured
    pub tick: u64,
    /// Hooks invoked
    pub updated: usize,
    /// Entities removed for reporting themselves dead
    pub removed: usize,
    /// Entities spawned by hooks
    pub spawned: usize,
    /// Entities in the captured frame
    pub captured: usize,
}

/// The universe controller.
pub struct Universe {
    config: UniverseConfig,
    registry: EntityRegistry,
    live: BTreeMap<EntityId, Box<dyn Entity>>,
    history: RingBuffer,
    ghosts: BTreeMap<EntityId, Ghost>,
    next_tick: u64,
}

impl Universe {
    /// Creates an empty universe with an empty kind registry.
    pub fn new(config: UniverseConfig) -> Result<Self> {
        Self::with_registry(config, EntityRegistry::new())
    }

    /// Creates an empty universe using `registry` for spawns.
    pub fn with_registry(config: UniverseConfig, registry: EntityRegistry) -> Result<Self> {
        let capacity = config.capacity()?;
        let history = RingBuffer::new(capacity)?;

        info!(
            "Universe sized for {} frames (radius={}, c={}, {} Hz, round_trip={})",
            capacity,
            config.radius,
            config.propagation_speed,
            config.ticks_per_second,
            config.round_trip
        );

        Ok(Self {
            config,
            registry,
            live: BTreeMap::new(),
            history,
            ghosts: BTreeMap::new(),
            next_tick: 0,
        })
    }

    /// The configuration the universe was built from.
    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    /// The kind registry.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Mutable access to the kind registry.
    pub fn registry_mut(&mut self) -> &mut EntityRegistry {
        &mut self.registry
    }

    /// Shorthand for `registry_mut().register(..)`.
    pub fn register<F>(&mut self, kind: &str, factory: F)
    where
        F: Fn(EntityId, Owner) -> Box<dyn Entity> + Send + Sync + 'static,
    {
        self.registry.register(kind, factory);
    }

    /// Spawns a new entity of `kind` and returns its id.
    ///
    /// The entity shows up in the frame captured by the next `update`.
    pub fn spawn(&mut self, kind: &str, owner: Owner) -> Result<EntityId> {
        let id = EntityId::next();
        let entity = self.registry.create(kind, id, owner)?;
        debug!("Spawned {} '{}' for {:?}", id, kind, owner);
        self.live.insert(id, entity);
        Ok(id)
    }

    /// Advances the simulation by one tick.
    ///
    /// On a hook failure the remaining hooks, the removal pass and the
    /// frame capture are skipped and the tick counter does not advance.
    pub fn update(&mut self) -> Result<TickReport> {
        let tick = self.next_tick;
        let view = WorldView {
            camera: self.config.camera_position(),
            bounds: self.config.bounds,
            tick,
            ticks_per_second: self.config.ticks_per_second,
            previous: self.history.latest(),
        };

        // Hooks run against the pre-update live set.
        let mut ctx = TickContext::new(view, &self.registry);
        for (id, entity) in self.live.iter_mut() {
            if let Err(source) = entity.update(&mut ctx) {
                warn!("Tick {} aborted: entity {} failed: {}", tick, id, source);
                return Err(WarpError::EntityUpdateFailure { id: *id, source });
            }
        }
        let updated = self.live.len();
        let spawns = ctx.spawns;

        let removed = self.remove_dead();

        let spawned = spawns.len();
        for (kind, owner) in spawns {
            self.spawn(&kind, owner)?;
        }

        let frame = Frame::capture(tick, self.live.values().map(|e| e.as_ref()));
        let captured = frame.len();
        self.history.push_frame(frame)?;
        self.next_tick += 1;
        self.prune_ghosts();

        debug!(
            "Tick {}: updated={} removed={} spawned={} captured={}",
            tick, updated, removed, spawned, captured
        );

        Ok(TickReport {
            tick,
            updated,
            removed,
            spawned,
            captured,
        })
    }

    /// What an observer at `position` sees, given signal `propagation_speed`
    /// and `ticks_per_second`.
    pub fn observe(
        &self,
        position: Position,
        propagation_speed: f64,
        ticks_per_second: f64,
    ) -> Observation<'_> {
        let observer = Observer {
            position,
            propagation_speed,
            ticks_per_second,
        };
        Observation::new(&self.history, &self.ghosts, observer)
    }

    /// [`observe`](Self::observe) with the configured speed and tick rate.
    pub fn observe_from(&self, position: Position) -> Observation<'_> {
        self.observe(
            position,
            self.config.propagation_speed,
            self.config.ticks_per_second,
        )
    }

    /// Tick of the newest frame, `None` before the first `update`.
    pub fn current_tick(&self) -> Option<u64> {
        self.history.latest_tick()
    }

    /// The frame history.
    pub fn history(&self) -> &RingBuffer {
        &self.history
    }

    /// History capacity in frames.
    pub fn capacity(&self) -> usize {
        self.history.capacity()
    }

    /// Live entity by id.
    pub fn entity(&self, id: EntityId) -> Option<&dyn Entity> {
        self.live.get(&id).map(|e| e.as_ref())
    }

    /// Mutable live entity by id, for collaborators acting between ticks.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut (dyn Entity + 'static)> {
        self.live.get_mut(&id).map(|e| e.as_mut())
    }

    /// Ids of live entities, ascending.
    pub fn live_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.live.keys().copied()
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Removed entities whose last frame is still inside the horizon.
    pub fn ghost_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ghosts.keys().copied()
    }

    fn remove_dead(&mut self) -> usize {
        let dead: Vec<EntityId> = self
            .live
            .iter()
            .filter(|(_, entity)| !entity.alive())
            .map(|(id, _)| *id)
            .collect();

        let previous = self.history.latest();
        for id in &dead {
            self.live.remove(id);

            // Entities that never made it into a frame leave no ghost.
            if let Some((frame, snapshot)) =
                previous.and_then(|frame| frame.get(*id).map(|s| (frame, s)))
            {
                self.ghosts.insert(
                    *id,
                    Ghost {
                        last_tick: frame.tick(),
                        position: snapshot.position(),
                    },
                );
            }
            debug!("Removed {}", id);
        }
        dead.len()
    }

    fn prune_ghosts(&mut self) {
        if let Some(horizon) = self.history.horizon() {
            self.ghosts.retain(|_, ghost| ghost.last_tick >= horizon);
        }
    }
}

impl std::fmt::Debug for Universe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Universe")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("live", &self.live.len())
            .field("ghosts", &self.ghosts.len())
            .field("capacity", &self.history.capacity())
            .field("next_tick", &self.next_tick)
            .finish()
    }
}
