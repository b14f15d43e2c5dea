//! Game-state driver.
//!
//! A [`Game`] owns a set of named [`GameState`]s and forwards `update` and
//! `render` to the active one. States ask for transitions and termination
//! through the [`GameControl`] they are handed during `update`; the game
//! applies those requests once the state's update has returned.

use crate::entities::{
    concrete_mut, mothership, probe, register_builtin_kinds, spawn_mothership, spawn_probe,
    Mothership,
};
use crate::error::SimError;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, info};
use warp_core::{render_observation, DrawContext, Owner, Position, Universe, UniverseConfig};

/// One screen or mode of the game.
pub trait GameState {
    /// Unique state name used by [`Game::switch_state`].
    fn name(&self) -> &str;

    /// Called when the state becomes active. `from` is the previous state.
    fn enter(&mut self, from: Option<&str>) -> Result<(), SimError>;

    /// Called when another state takes over.
    fn exit(&mut self, to: &str) -> Result<(), SimError>;

    /// Advances the state by one frame.
    fn update(&mut self, ctl: &mut GameControl) -> Result<(), SimError>;

    /// Draws the state.
    fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), SimError>;
}

/// Requests a state can make of the game during `update`.
#[derive(Debug, Default)]
pub struct GameControl {
    current: String,
    switch_to: Option<String>,
    terminate: bool,
}

impl GameControl {
    /// Name of the state being updated.
    pub fn current_state_name(&self) -> &str {
        &self.current
    }

    /// Switches to `to` once the current update returns.
    pub fn switch_state(&mut self, to: &str) {
        self.switch_to = Some(to.to_string());
    }

    /// Stops the game once the current update returns.
    pub fn terminate(&mut self) {
        self.terminate = true;
    }
}

/// Owns the states and the run flag.
pub struct Game {
    states: HashMap<String, Box<dyn GameState>>,
    current: Option<String>,
    running: bool,
    frames: u64,
}

impl Game {
    /// Creates a running game with no states.
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            current: None,
            running: true,
            frames: 0,
        }
    }

    /// Adds a state, replacing any state with the same name.
    pub fn add_state(&mut self, state: Box<dyn GameState>) {
        self.states.insert(state.name().to_string(), state);
    }

    /// Name of the active state.
    pub fn current_state_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Exits the active state (if any) and enters `to`.
    ///
    /// If the active state fails to exit it stays active.
    pub fn switch_state(&mut self, to: &str) -> Result<(), SimError> {
        if !self.states.contains_key(to) {
            return Err(SimError::unknown_state(to));
        }

        let from = self.current.clone();
        if let Some(state) = from.as_deref().and_then(|name| self.states.get_mut(name)) {
            info!("Exiting state: {}", state.name());
            state.exit(to)?;
        }

        info!("Enter state: {}", to);
        self.current = Some(to.to_string());
        if let Some(state) = self.states.get_mut(to) {
            state.enter(from.as_deref())?;
        }
        Ok(())
    }

    /// Returns false once the game has been terminated.
    pub fn running(&self) -> bool {
        self.running
    }

    /// Stops the game.
    pub fn terminate(&mut self) {
        self.running = false;
    }

    /// Frames updated so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Updates the active state and applies the requests it made.
    pub fn update(&mut self) -> Result<(), SimError> {
        let name = self.current.clone().ok_or(SimError::NoActiveState)?;
        let state = self
            .states
            .get_mut(&name)
            .ok_or_else(|| SimError::unknown_state(name.as_str()))?;

        let mut ctl = GameControl {
            current: name,
            ..Default::default()
        };
        state.update(&mut ctl)?;
        self.frames += 1;

        if ctl.terminate {
            debug!("State {} requested termination", ctl.current);
            self.terminate();
        }
        if let Some(to) = ctl.switch_to {
            self.switch_state(&to)?;
        }
        Ok(())
    }

    /// Renders the active state.
    pub fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), SimError> {
        let state = self
            .current
            .as_deref()
            .and_then(|name| self.states.get(name))
            .ok_or(SimError::NoActiveState)?;
        state.render(ctx)
    }

    /// Updates and renders until terminated or `max_frames` is reached.
    pub fn run(&mut self, ctx: &mut dyn DrawContext, max_frames: u64) -> Result<u64, SimError> {
        let start = self.frames;
        while self.running && self.frames - start < max_frames {
            self.update()?;
            self.render(ctx)?;
        }
        Ok(self.frames - start)
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

/// The in-game state: steps a universe and draws what the camera sees.
pub struct PlayState {
    universe: Universe,
    camera: Position,
    max_ticks: Option<u64>,
}

impl PlayState {
    /// Name the state is registered under.
    pub const NAME: &'static str = "play";

    /// Creates a play state over `universe`, viewed from the configured camera.
    pub fn new(universe: Universe) -> Self {
        let camera = universe.config().camera_position();
        Self {
            universe,
            camera,
            max_ticks: None,
        }
    }

    /// A launching enemy mothership at the origin plus `probes` player probes
    /// scattered inside the bounds from `seed`.
    pub fn skirmish(config: UniverseConfig, seed: u64, probes: usize) -> Result<Self, SimError> {
        let mut universe = Universe::new(config)?;
        register_builtin_kinds(universe.registry_mut());

        let launch_every = (universe.capacity() as u64 / 2).max(1);
        let ship = spawn_mothership(&mut universe, Owner::Enemy, Position::zeros())?;
        concrete_mut::<Mothership>(&mut universe, ship, mothership::KIND)?.launch_every =
            Some(launch_every);

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bounds = universe.config().bounds;
        let speed = universe.config().propagation_speed;
        for _ in 0..probes {
            let position = Position::new(
                rng.gen_range(bounds.min_x..=bounds.max_x),
                rng.gen_range(bounds.min_y..=bounds.max_y),
            );
            let velocity =
                Position::new(rng.gen_range(-0.5..=0.5), rng.gen_range(-0.5..=0.5)) * speed;
            spawn_probe(
                &mut universe,
                Owner::Player,
                position,
                velocity,
                Some(probe::DEFAULT_LIFETIME_TICKS),
            )?;
        }

        debug!(
            "Skirmish ready: {} probes, mothership launches every {} ticks",
            probes, launch_every
        );
        Ok(Self::new(universe))
    }

    /// Terminates the game after `ticks` universe updates.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Moves the camera.
    pub fn set_camera(&mut self, camera: Position) {
        self.camera = camera;
    }

    /// The simulated universe.
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Mutable access for spawning and damage between frames.
    pub fn universe_mut(&mut self) -> &mut Universe {
        &mut self.universe
    }
}

impl GameState for PlayState {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn enter(&mut self, from: Option<&str>) -> Result<(), SimError> {
        debug!(
            "Play entered from {:?} with {} live entities",
            from,
            self.universe.live_count()
        );
        Ok(())
    }

    fn exit(&mut self, _to: &str) -> Result<(), SimError> {
        Ok(())
    }

    fn update(&mut self, ctl: &mut GameControl) -> Result<(), SimError> {
        let report = self.universe.update()?;
        if self.max_ticks.map_or(false, |max| report.tick + 1 >= max) {
            ctl.terminate();
        }
        Ok(())
    }

    fn render(&self, ctx: &mut dyn DrawContext) -> Result<(), SimError> {
        let drawn = render_observation(self.universe.observe_from(self.camera), ctx)?;
        debug!("Rendered {} snapshots", drawn);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{register_builtin_kinds, spawn_mothership, spawn_probe};
    use std::cell::RefCell;
    use std::rc::Rc;
    use warp_core::{DrawList, Owner, UniverseConfig};

    /// Records lifecycle calls and switches to `next` on first update.
    struct Recorder {
        name: &'static str,
        next: Option<&'static str>,
        log: Rc<RefCell<Vec<String>>>,
        refuse_exit: bool,
    }

    impl Recorder {
        fn new(name: &'static str, next: Option<&'static str>, log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                name,
                next,
                log: log.clone(),
                refuse_exit: false,
            }
        }
    }

    impl GameState for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn enter(&mut self, from: Option<&str>) -> Result<(), SimError> {
            self.log.borrow_mut().push(format!("enter {} from {:?}", self.name, from));
            Ok(())
        }

        fn exit(&mut self, to: &str) -> Result<(), SimError> {
            if self.refuse_exit {
                return Err(SimError::unknown_state(to));
            }
            self.log.borrow_mut().push(format!("exit {} to {}", self.name, to));
            Ok(())
        }

        fn update(&mut self, ctl: &mut GameControl) -> Result<(), SimError> {
            if let Some(next) = self.next.take() {
                ctl.switch_state(next);
            }
            Ok(())
        }

        fn render(&self, _ctx: &mut dyn DrawContext) -> Result<(), SimError> {
            Ok(())
        }
    }

    fn play_universe() -> Universe {
        let mut universe = Universe::new(UniverseConfig::default()).unwrap();
        register_builtin_kinds(universe.registry_mut());
        universe
    }

    #[test]
    fn test_switch_state_lifecycle() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut game = Game::new();
        game.add_state(Box::new(Recorder::new("title", Some("menu"), &log)));
        game.add_state(Box::new(Recorder::new("menu", None, &log)));

        game.switch_state("title").unwrap();
        game.update().unwrap();

        assert_eq!(game.current_state_name(), Some("menu"));
        assert_eq!(
            *log.borrow(),
            vec![
                "enter title from None".to_string(),
                "exit title to menu".to_string(),
                "enter menu from Some(\"title\")".to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_exit_keeps_current_state() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut game = Game::new();
        let mut title = Recorder::new("title", Some("menu"), &log);
        title.refuse_exit = true;
        game.add_state(Box::new(title));
        game.add_state(Box::new(Recorder::new("menu", None, &log)));

        game.switch_state("title").unwrap();
        assert!(game.update().is_err());

        assert_eq!(game.current_state_name(), Some("title"));
        assert!(game.update().is_ok());
        assert_eq!(*log.borrow(), vec!["enter title from None".to_string()]);
    }

    #[test]
    fn test_unknown_state() {
        let mut game = Game::new();
        let result = game.switch_state("credits");

        assert!(matches!(result, Err(SimError::UnknownState(ref s)) if s == "credits"));
        assert!(matches!(game.update(), Err(SimError::NoActiveState)));
    }

    #[test]
    fn test_play_state_runs_until_max_ticks() {
        let mut universe = play_universe();
        spawn_mothership(&mut universe, Owner::Enemy, Position::zeros()).unwrap();

        let mut game = Game::new();
        game.add_state(Box::new(PlayState::new(universe).with_max_ticks(5)));
        game.switch_state(PlayState::NAME).unwrap();

        let mut list = DrawList::new();
        let frames = game.run(&mut list, 100).unwrap();

        assert_eq!(frames, 5);
        assert!(!game.running());
        // One hull per rendered frame.
        assert_eq!(list.fill_count(), 5);
    }

    #[test]
    fn test_skirmish_plays_out() {
        let play = PlayState::skirmish(UniverseConfig::default(), 5, 6).unwrap();
        assert_eq!(play.universe().live_count(), 7);

        let mut game = Game::new();
        game.add_state(Box::new(play.with_max_ticks(30)));
        game.switch_state(PlayState::NAME).unwrap();

        let mut list = DrawList::new();
        assert_eq!(game.run(&mut list, 100).unwrap(), 30);
        // The mothership sits under the camera and is drawn every frame.
        assert!(list.fill_count() >= 30);
    }

    #[test]
    fn test_play_state_renders_observed_state() {
        let mut universe = play_universe();
        spawn_probe(&mut universe, Owner::Player, Position::new(4.0, 0.0), Position::zeros(), Some(10))
            .unwrap();
        let mut play = PlayState::new(universe);
        let mut ctl = GameControl::default();

        // Ticks 0 to 9; the probe expires during tick 9.
        for _ in 0..10 {
            play.update(&mut ctl).unwrap();
        }
        assert_eq!(play.universe().live_count(), 0);

        // Still seen from 4 units away, gone for an observer on top of it.
        let mut list = DrawList::new();
        play.render(&mut list).unwrap();
        assert_eq!(list.fill_count(), 1);

        play.set_camera(Position::new(4.0, 0.0));
        list.clear();
        play.render(&mut list).unwrap();
        assert_eq!(list.fill_count(), 0);
    }
}
