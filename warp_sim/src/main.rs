//! Warp Simulator CLI
//!
//! Run seeded observation scenarios against the warp core.

use clap::Parser;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use warp_core::{DrawList, UniverseConfig};
use warp_sim::scenarios::ScenarioId;
use warp_sim::{Game, PlayState, ScenarioResult, ScenarioRunner, SimError};

/// Warp observation scenario CLI
#[derive(Parser, Debug)]
#[command(name = "warp-sim")]
#[command(about = "Run seeded finite-speed observation scenarios", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (lightcone, horizon, ghosts, salvo, swarm, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Maximum simulation duration in seconds
    #[arg(short, long, default_value = "30")]
    duration: f64,

    /// Universe radius in world units
    #[arg(long)]
    radius: Option<f64>,

    /// Signal propagation speed in world units per second
    #[arg(long)]
    speed: Option<f64>,

    /// Simulation tick rate in Hz
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Size the history for one-way travel instead of a round trip
    #[arg(long)]
    one_way: bool,

    /// Universe configuration file (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export simulation data to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Play a skirmish for this many ticks instead of running scenarios
    #[arg(long, value_name = "TICKS")]
    play: Option<u64>,

    /// Probes scattered at the start of a skirmish
    #[arg(long, default_value = "12")]
    probes: usize,
}

impl Args {
    /// Loads the configuration file (or defaults) and applies flag overrides.
    fn universe_config(&self) -> Result<UniverseConfig, SimError> {
        let mut config = match &self.config {
            Some(path) => UniverseConfig::from_json_file(path)?,
            None => UniverseConfig::default(),
        };

        if let Some(radius) = self.radius {
            config.radius = radius;
            if self.config.is_none() {
                config.bounds = warp_core::Bounds::centered(radius);
            }
        }
        if let Some(speed) = self.speed {
            config.propagation_speed = speed;
        }
        if let Some(rate) = self.tick_rate {
            config.ticks_per_second = rate;
        }
        if self.one_way {
            config.round_trip = false;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match args.universe_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    if !args.json {
        info!("Warp Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!(
            "R={} c={} f={}Hz round_trip={} => {} frames",
            config.radius,
            config.propagation_speed,
            config.ticks_per_second,
            config.round_trip,
            config.capacity().unwrap_or(0)
        );
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!("Available scenarios: lightcone, horizon, ghosts, salvo, swarm, all");
                process::exit(1);
            }
        }
    };

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    // Handle --play mode
    if let Some(ticks) = args.play {
        if let Err(e) = play(config, seed, args.probes, ticks) {
            error!("Skirmish failed: {}", e);
            process::exit(1);
        }
        return;
    }

    let runner = ScenarioRunner::new(seed, config).with_duration(args.duration);

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            process::exit(1);
        }

        let (result, export) = runner.run_with_export(scenarios[0]);
        match export.write_to_file(export_path) {
            Ok(()) => info!("Exported {} frames to {}", export.frames.len(), export_path),
            Err(e) => error!("Failed to write export: {}", e),
        }
        report(&result, args.json);
        if !result.passed {
            process::exit(1);
        }
        return;
    }

    let results: Vec<ScenarioResult> = scenarios.iter().map(|s| runner.run(*s)).collect();
    if !args.json {
        for result in &results {
            report(result, false);
        }
    }

    let total = results.len();
    let failed = results.iter().filter(|r| !r.passed).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed,
            "failed": failed,
            "results": results.iter().map(result_json).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed, total);
        }
    }

    // Exit with proper code for CI
    if failed > 0 {
        process::exit(1);
    }
}

/// Drives the game loop over a skirmish, recording draw calls.
fn play(config: UniverseConfig, seed: u64, probes: usize, ticks: u64) -> Result<(), SimError> {
    let state = PlayState::skirmish(config, seed, probes)?.with_max_ticks(ticks);

    let mut game = Game::new();
    game.add_state(Box::new(state));
    game.switch_state(PlayState::NAME)?;

    let mut list = DrawList::new();
    let frames = game.run(&mut list, ticks)?;
    info!(
        "Played {} frames (seed={}): {} draw commands, {} snapshots drawn",
        frames,
        seed,
        list.commands().len(),
        list.fill_count()
    );
    Ok(())
}

fn report(result: &ScenarioResult, json: bool) {
    if json {
        if let Ok(out) = serde_json::to_string_pretty(&result_json(result)) {
            println!("{}", out);
        }
    } else if result.passed {
        info!("✓ {} (seed={}) PASSED", result.scenario.name(), result.seed);
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn result_json(r: &ScenarioResult) -> serde_json::Value {
    serde_json::json!({
        "scenario": r.scenario.name(),
        "seed": r.seed,
        "passed": r.passed,
        "ticks": r.total_ticks,
        "final_tick": r.final_tick,
        "entities": r.final_entity_count,
        "metrics": r.metrics,
        "failure_reason": r.failure_reason,
    })
}
