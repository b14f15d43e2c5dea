//! Scenario runner - drives a universe through each observation scenario.
//!
//! Every scenario builds a fresh [`Universe`] from the runner's configuration,
//! seeds its randomness from the runner's seed and checks what observers see
//! against what the history says they should see. Checks never abort a run;
//! every mismatch is recorded and the first one becomes the failure reason.

use crate::entities::{
    concrete_mut, mothership, register_builtin_kinds, spawn_mothership, spawn_probe, Mothership,
    Probe,
};
use crate::error::SimError;
use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};
use warp_core::{
    delay_ticks, target_tick, DamageType, Entity, EntityId, Frame, Owner, Position, Snapshot,
    TargetTick, TickReport, Universe, UniverseConfig,
};

/// Probes placed along the line in the lightcone scenario, at most.
const MAX_LINE_PROBES: usize = 16;

/// Random observers per tick in the swarm scenario.
const SWARM_OBSERVERS: usize = 3;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Tick of the newest frame at the end
    pub final_tick: Option<u64>,

    /// Number of live entities at end
    pub final_entity_count: usize,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Snapshots returned by observation queries
    pub observations: u64,

    /// Observed snapshots of entities no longer live
    pub ghost_sightings: u64,

    /// Live candidates whose delay reached past the horizon
    pub clamped_lookups: u64,

    /// Candidates skipped because the target frame did not hold them
    pub skipped_for_history: u64,
}

/// One scenario run in progress.
struct Session {
    universe: Universe,
    camera: Position,
    metrics: ScenarioMetrics,
    export: Option<SimExport>,
    violations: Vec<String>,
    ticks: u64,
}

impl Session {
    /// Advances one tick and records it if exporting.
    fn step(&mut self) -> Result<TickReport, SimError> {
        let report = self.universe.update()?;
        self.ticks += 1;

        if let Some(export) = self.export.as_mut() {
            if let Some(frame) = SimFrame::capture(&self.universe, self.camera) {
                export.add_frame(frame);
            }
        }
        Ok(report)
    }

    /// Observes from `from` with the configured speed and tick rate,
    /// updating the counters.
    fn survey(&mut self, from: Position) -> Vec<(EntityId, Snapshot)> {
        let observed: Vec<(EntityId, Snapshot)> = self.universe.observe_from(from).collect();

        let candidates = self.universe.history().latest().map_or(0, Frame::len)
            + self.universe.ghost_ids().count();
        let ghosts = observed
            .iter()
            .filter(|(id, _)| self.universe.entity(*id).is_none())
            .count();
        let clamped = self.clamped_lookups(from);

        self.metrics.observations += observed.len() as u64;
        self.metrics.ghost_sightings += ghosts as u64;
        self.metrics.clamped_lookups += clamped;
        self.metrics.skipped_for_history += candidates.saturating_sub(observed.len()) as u64;
        observed
    }

    /// Where an observer at `from` should read an entity now at `source`.
    fn expected_tick(&self, from: Position, source: Position) -> Option<TargetTick> {
        let history = self.universe.history();
        let config = self.universe.config();
        let delay = delay_ticks(
            (source - from).norm(),
            config.propagation_speed,
            config.ticks_per_second,
        );
        target_tick(history.latest_tick()?, history.capacity() as u64, delay)
    }

    fn clamped_lookups(&self, from: Position) -> u64 {
        let Some(latest) = self.universe.history().latest() else {
            return 0;
        };
        latest
            .iter()
            .filter_map(|(_, snapshot)| self.expected_tick(from, snapshot.position()))
            .filter(|target| target.clamped)
            .count() as u64
    }

    /// Observed ids whose snapshot is not the one the history dictates.
    ///
    /// Live entities must come from exactly the target frame; ghosts from
    /// some retained frame.
    fn inconsistent(&self, from: Position, seen: &[(EntityId, Snapshot)]) -> Vec<EntityId> {
        let history = self.universe.history();
        let latest = history.latest();

        seen.iter()
            .filter(|(id, snapshot)| {
                let consistent = match latest.and_then(|frame| frame.get(*id)) {
                    Some(now) => self
                        .expected_tick(from, now.position())
                        .and_then(|target| history.frame_at(target.tick))
                        .and_then(|frame| frame.get(*id))
                        .map_or(false, |expected| expected.ptr_eq(snapshot)),
                    None => history
                        .iter()
                        .any(|frame| frame.get(*id).map_or(false, |s| s.ptr_eq(snapshot))),
                };
                !consistent
            })
            .map(|(id, _)| *id)
            .collect()
    }

    fn check(&mut self, ok: bool, violation: impl FnOnce() -> String) {
        if !ok {
            let msg = violation();
            debug!("  violation: {}", msg);
            self.violations.push(msg);
        }
    }

    fn finish(mut self, scenario: ScenarioId, seed: u64) -> (ScenarioResult, Option<SimExport>) {
        let passed = self.violations.is_empty();
        if let Some(export) = self.export.as_mut() {
            export.finalize(passed);
        }

        let result = ScenarioResult {
            scenario,
            seed,
            passed,
            total_ticks: self.ticks,
            final_tick: self.universe.current_tick(),
            final_entity_count: self.universe.live_count(),
            failure_reason: self.violations.first().cloned(),
            metrics: self.metrics,
        };
        (result, self.export)
    }
}

fn find(seen: &[(EntityId, Snapshot)], id: EntityId) -> Option<&Snapshot> {
    seen.iter().find(|(s, _)| *s == id).map(|(_, snapshot)| snapshot)
}

fn probe_age(snapshot: &Snapshot) -> Option<u64> {
    snapshot.downcast_ref::<Probe>().map(Probe::age)
}

fn ship_hp(snapshot: &Snapshot) -> Option<f64> {
    snapshot.downcast_ref::<Mothership>().map(Mothership::hp)
}

/// Runs observation scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Universe configuration every scenario starts from
    config: UniverseConfig,

    /// Maximum duration in seconds
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, config: UniverseConfig) -> Self {
        Self {
            seed,
            config,
            max_duration_secs: 30.0,
        }
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// The seed scenarios derive their randomness from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The universe configuration.
    pub fn config(&self) -> &UniverseConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, false).0
    }

    /// Runs a scenario, recording every tick for export.
    pub fn run_with_export(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        let (result, export) = self.execute(scenario, true);
        let export = export.unwrap_or_else(|| SimExport::new(scenario.name(), self.seed, 0));
        (result, export)
    }

    fn execute(&self, scenario: ScenarioId, record: bool) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut session = match self.session(scenario, record) {
            Ok(session) => session,
            Err(e) => {
                warn!("Scenario {} could not start: {}", scenario.name(), e);
                return (self.aborted(scenario, e), None);
            }
        };

        let outcome = match scenario {
            ScenarioId::Lightcone => self.run_lightcone(&mut session),
            ScenarioId::Horizon => self.run_horizon(&mut session),
            ScenarioId::Ghosts => self.run_ghosts(&mut session),
            ScenarioId::Salvo => self.run_salvo(&mut session),
            ScenarioId::Swarm => self.run_swarm(&mut session),
        };

        if let Err(e) = outcome {
            warn!("Scenario {} aborted: {}", scenario.name(), e);
            session.violations.insert(0, format!("aborted: {}", e));
        }
        session.finish(scenario, self.seed)
    }

    fn session(&self, scenario: ScenarioId, record: bool) -> Result<Session, SimError> {
        let mut universe = Universe::new(self.config.clone())?;
        register_builtin_kinds(universe.registry_mut());

        let export = record.then(|| SimExport::new(scenario.name(), self.seed, universe.capacity()));
        Ok(Session {
            camera: self.config.camera_position(),
            universe,
            metrics: ScenarioMetrics::default(),
            export,
            violations: Vec::new(),
            ticks: 0,
        })
    }

    fn aborted(&self, scenario: ScenarioId, error: SimError) -> ScenarioResult {
        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: false,
            total_ticks: 0,
            final_tick: None,
            final_entity_count: 0,
            failure_reason: Some(error.to_string()),
            metrics: ScenarioMetrics::default(),
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed.wrapping_mul(0x9e3779b97f4a7c15))
    }

    fn target_ticks(&self) -> u64 {
        (self.max_duration_secs * self.config.ticks_per_second)
            .ceil()
            .max(1.0) as u64
    }

    /// Distance a signal covers in one tick.
    fn tick_distance(&self) -> f64 {
        self.config.propagation_speed / self.config.ticks_per_second
    }

    fn random_position(&self, rng: &mut ChaCha8Rng) -> Position {
        let b = self.config.bounds;
        Position::new(
            rng.gen_range(b.min_x..=b.max_x),
            rng.gen_range(b.min_y..=b.max_y),
        )
    }

    fn random_owner(rng: &mut ChaCha8Rng) -> Owner {
        match rng.gen_range(0..3) {
            0 => Owner::Enemy,
            1 => Owner::Player,
            _ => Owner::Team,
        }
    }

    /// WARP-001: Lightcone - probes in a line, each half a tick of travel
    /// further out than the last.
    ///
    /// **Assertion**: an observer at the origin sees probe `k` exactly `k`
    /// ticks late once `k` frames exist and not at all before, so farther
    /// probes never look newer.
    fn run_lightcone(&self, s: &mut Session) -> Result<(), SimError> {
        info!("WARP-001: Lightcone - delay grows with distance");

        let unit = self.tick_distance();
        let count = ((self.config.radius / unit - 0.5).floor().max(0.0) as usize + 1)
            .min(MAX_LINE_PROBES);

        let mut probes = Vec::with_capacity(count);
        for k in 0..count {
            let position = Position::new((k as f64 + 0.5) * unit, 0.0);
            let id = spawn_probe(&mut s.universe, Owner::Player, position, Position::zeros(), None)?;
            probes.push((id, position));
        }

        let observer = Position::zeros();
        let ticks = self.target_ticks().max(s.universe.capacity() as u64 + 1);

        for _ in 0..ticks {
            let report = s.step()?;
            let seen = s.survey(observer);

            let mut newest_allowed = u64::MAX;
            for (id, position) in &probes {
                // A probe captured in frame t has been updated t + 1 times.
                let expected = s.expected_tick(observer, *position).map(|t| t.tick + 1);
                let age = find(&seen, *id).and_then(probe_age);
                s.check(age == expected, || {
                    format!(
                        "tick {}: probe {} seen at age {:?}, expected {:?}",
                        report.tick, id, age, expected
                    )
                });

                if let Some(age) = age {
                    s.check(age <= newest_allowed, || {
                        format!("tick {}: probe {} looks newer than a nearer one", report.tick, id)
                    });
                    newest_allowed = age;
                }
            }
        }

        info!(
            "Lightcone complete: {} probes, {} observations over {} ticks",
            count, s.metrics.observations, s.ticks
        );
        Ok(())
    }

    /// WARP-002: Horizon - an observer further away than the buffer reaches.
    ///
    /// **Assertion**: the far observer always reads the oldest retained frame
    /// while an observer on top of the probe reads the newest.
    fn run_horizon(&self, s: &mut Session) -> Result<(), SimError> {
        info!("WARP-002: Horizon - far observer clamped to the oldest frame");

        let probe = spawn_probe(
            &mut s.universe,
            Owner::Enemy,
            Position::zeros(),
            Position::zeros(),
            None,
        )?;
        let capacity = s.universe.capacity() as u64;
        let far = Position::new((capacity as f64 + 1.0) * self.tick_distance(), 0.0);
        let near = Position::zeros();
        let ticks = self.target_ticks().max(2 * capacity);

        for _ in 0..ticks {
            let report = s.step()?;
            let horizon = s.universe.history().horizon().unwrap_or(0);

            let far_age = find(&s.survey(far), probe).and_then(probe_age);
            s.check(far_age == Some(horizon + 1), || {
                format!(
                    "tick {}: far observer saw age {:?}, horizon frame is {}",
                    report.tick, far_age, horizon
                )
            });

            let near_age = find(&s.survey(near), probe).and_then(probe_age);
            s.check(near_age == Some(report.tick + 1), || {
                format!("tick {}: near observer saw age {:?}", report.tick, near_age)
            });
        }

        let clamped = s.metrics.clamped_lookups;
        s.check(clamped >= ticks, || {
            format!("only {} of {} far lookups were clamped", clamped, ticks)
        });

        info!("Horizon complete: {} clamped lookups", clamped);
        Ok(())
    }

    /// WARP-003: Ghosts - probes with staggered lifetimes, watched from beyond
    /// the horizon.
    ///
    /// **Assertion**: a probe last captured at tick `T` stays visible to the
    /// far observer exactly while `T` is inside the retention window.
    fn run_ghosts(&self, s: &mut Session) -> Result<(), SimError> {
        info!("WARP-003: Ghosts - despawned probes linger until the horizon");

        let mut rng = self.rng();
        let capacity = s.universe.capacity() as u64;
        let max_life = (self.target_ticks() / 2).max(3);

        let count = rng.gen_range(8..=16);
        for _ in 0..count {
            let position = self.random_position(&mut rng);
            let lifetime = rng.gen_range(2..=max_life);
            spawn_probe(
                &mut s.universe,
                Self::random_owner(&mut rng),
                position,
                Position::zeros(),
                Some(lifetime),
            )?;
        }

        // Every probe is more than `capacity` ticks of travel away.
        let far = Position::new(
            self.config.bounds.max_x + (capacity as f64 + 1.0) * self.tick_distance(),
            0.0,
        );
        let ticks = self.target_ticks().max(max_life + capacity + 2);
        let mut last_seen_at: BTreeMap<EntityId, Option<u64>> = BTreeMap::new();

        for _ in 0..ticks {
            let before: Vec<EntityId> = s.universe.live_ids().collect();
            let report = s.step()?;
            for id in before {
                if s.universe.entity(id).is_none() {
                    last_seen_at.insert(id, report.tick.checked_sub(1));
                }
            }

            let seen: BTreeSet<EntityId> = s.survey(far).into_iter().map(|(id, _)| id).collect();
            let horizon = s.universe.history().horizon().unwrap_or(0);

            for (id, last) in &last_seen_at {
                let expected = last.map_or(false, |t| t >= horizon);
                let visible = seen.contains(id);
                s.check(visible == expected, || {
                    format!(
                        "tick {}: ghost {} (last frame {:?}) visible={} expected={}",
                        report.tick, id, last, visible, expected
                    )
                });
            }

            let live: Vec<EntityId> = s.universe.live_ids().collect();
            let missing = live.iter().filter(|id| !seen.contains(id)).count();
            s.check(missing == 0, || {
                format!("tick {}: {} live probes invisible to the far observer", report.tick, missing)
            });
        }

        let lingering = s.universe.ghost_ids().count();
        s.check(lingering == 0, || {
            format!("{} ghosts still tracked after every probe aged out", lingering)
        });
        let sightings = s.metrics.ghost_sightings;
        s.check(capacity < 2 || sightings > 0, || "no ghost was ever seen".to_string());

        info!(
            "Ghosts complete: {} probes expired, {} ghost sightings",
            last_seen_at.len(),
            sightings
        );
        Ok(())
    }

    /// WARP-004: Salvo - a mothership takes laser fire every tick until it
    /// breaks up.
    ///
    /// **Assertion**: the observer at the wreck loses sight of it on the next
    /// tick; an observer `d` away keeps seeing it for `delay(d)` more ticks and
    /// never sees less hull than the near observer.
    fn run_salvo(&self, s: &mut Session) -> Result<(), SimError> {
        info!("WARP-004: Salvo - mothership under laser fire");

        let mut rng = self.rng();
        let ship = spawn_mothership(&mut s.universe, Owner::Enemy, Position::zeros())?;
        let near = Position::zeros();
        let far = Position::new(self.config.radius, 0.0);
        // Delays past the window read the oldest frame, `capacity - 1` back.
        let far_delay = delay_ticks(
            self.config.radius,
            self.config.propagation_speed,
            self.config.ticks_per_second,
        )
        .min(s.universe.capacity() as u64 - 1);

        let max_shots = (mothership::MAX_HP / 5.0).ceil() as u64;
        let ticks = self
            .target_ticks()
            .max(max_shots + s.universe.capacity() as u64 + 2);

        let mut destroyed_at = None;
        let mut near_lost = None;
        let mut far_seen_at = None;
        let mut far_lost = None;

        for _ in 0..ticks {
            let report = s.step()?;

            let near_hp = find(&s.survey(near), ship).and_then(ship_hp);
            let far_hp = find(&s.survey(far), ship).and_then(ship_hp);
            if near_hp.is_none() && near_lost.is_none() {
                near_lost = Some(report.tick);
            }
            if far_hp.is_some() && far_seen_at.is_none() {
                far_seen_at = Some(report.tick);
            }
            if far_hp.is_none() && far_seen_at.is_some() && far_lost.is_none() {
                far_lost = Some(report.tick);
            }
            if let (Some(near_hp), Some(far_hp)) = (near_hp, far_hp) {
                s.check(far_hp >= near_hp, || {
                    format!(
                        "tick {}: far observer saw {} hp, near observer {}",
                        report.tick, far_hp, near_hp
                    )
                });
            }

            if destroyed_at.is_none() {
                let damage = rng.gen_range(5.0..15.0);
                let alive = concrete_mut::<Mothership>(&mut s.universe, ship, mothership::KIND)?
                    .take_fire(damage, DamageType::Laser);
                debug!("  tick {}: hit for {:.1}, alive={}", report.tick, damage, alive);
                if !alive {
                    destroyed_at = Some(report.tick);
                }
            }
        }

        s.check(destroyed_at.is_some(), || "mothership survived the salvo".to_string());
        s.check(far_seen_at == Some(far_delay), || {
            format!(
                "far observer ({} ticks away) first saw the ship at {:?}",
                far_delay, far_seen_at
            )
        });
        if let Some(destroyed) = destroyed_at {
            s.check(near_lost == Some(destroyed + 1), || {
                format!(
                    "destroyed at tick {}, near observer lost it at {:?}",
                    destroyed, near_lost
                )
            });
            s.check(far_lost == Some(destroyed + 1 + far_delay), || {
                format!(
                    "destroyed at tick {}, far observer ({} ticks away) lost it at {:?}",
                    destroyed, far_delay, far_lost
                )
            });
        }

        info!(
            "Salvo complete: destroyed at {:?}, far first saw it at {:?}, lost near={:?} far={:?}",
            destroyed_at, far_seen_at, near_lost, far_lost
        );
        Ok(())
    }

    /// WARP-005: Swarm - random movers, random spawns, a launching mothership.
    ///
    /// **Assertion**: every tick, for several random observers, each observed
    /// snapshot is the one the history dictates, repeated queries agree, and
    /// the newest frame holds exactly the live set.
    fn run_swarm(&self, s: &mut Session) -> Result<(), SimError> {
        info!("WARP-005: Swarm - observation consistency under churn");

        let mut rng = self.rng();
        let capacity = s.universe.capacity() as u64;
        let ticks = self.target_ticks();

        let carrier = spawn_mothership(&mut s.universe, Owner::Team, Position::zeros())?;
        concrete_mut::<Mothership>(&mut s.universe, carrier, mothership::KIND)?.launch_every =
            Some((capacity / 2).max(1));

        let initial = rng.gen_range(10..=30);
        for _ in 0..initial {
            self.spawn_random_probe(&mut rng, &mut s.universe, ticks)?;
        }

        for _ in 0..ticks {
            if rng.gen_bool(0.2) {
                self.spawn_random_probe(&mut rng, &mut s.universe, ticks)?;
            }
            let report = s.step()?;

            let captured = s.universe.history().latest().map_or(0, Frame::len);
            let live = s.universe.live_count();
            s.check(captured == live, || {
                format!("tick {}: frame holds {} entities, {} live", report.tick, captured, live)
            });

            for _ in 0..SWARM_OBSERVERS {
                let from = self.random_position(&mut rng);
                let seen = s.survey(from);
                let again: Vec<(EntityId, Snapshot)> = s.universe.observe_from(from).collect();

                let idempotent = seen.len() == again.len()
                    && seen
                        .iter()
                        .zip(&again)
                        .all(|(a, b)| a.0 == b.0 && a.1.ptr_eq(&b.1));
                s.check(idempotent, || {
                    format!("tick {}: repeated observation disagreed", report.tick)
                });

                let bad = s.inconsistent(from, &seen);
                s.check(bad.is_empty(), || {
                    format!("tick {}: inconsistent snapshots for {:?}", report.tick, bad)
                });
            }

            if report.tick % 10 == 0 {
                debug!(
                    "  tick {} | live={} | removed={} | spawned={}",
                    report.tick, live, report.removed, report.spawned
                );
            }
        }

        info!(
            "Swarm complete: {} observations, {} ghost sightings, {} clamped",
            s.metrics.observations, s.metrics.ghost_sightings, s.metrics.clamped_lookups
        );
        Ok(())
    }

    fn spawn_random_probe(
        &self,
        rng: &mut ChaCha8Rng,
        universe: &mut Universe,
        max_life: u64,
    ) -> Result<EntityId, SimError> {
        let position = self.random_position(rng);
        let velocity = Position::new(rng.gen_range(-0.5..=0.5), rng.gen_range(-0.5..=0.5))
            * self.config.propagation_speed;
        let lifetime = if rng.gen_bool(0.3) {
            None
        } else {
            Some(rng.gen_range(2..=max_life.max(2)))
        };
        spawn_probe(universe, Self::random_owner(rng), position, velocity, lifetime)
    }
}
