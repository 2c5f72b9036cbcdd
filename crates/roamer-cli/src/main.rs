//! `roamer` – runs a search mission against the built-in simulator.
//!
//! 1. Loads `~/.roamer/config.toml` (or the built-in arena when absent) and
//!    applies `ROAMER_*` environment overrides.
//! 2. Builds a ray-casting [`SimRobot`] behind a [`RetryingActuator`].
//! 3. Runs the mission with the scripted plan from the config, or the
//!    greedy planner when none is given.
//! 4. Intercepts **Ctrl-C** to stop the mission at the next tick boundary.
//!
//! Flags: `--json` prints the final report as JSON; `--write-config` saves
//! the effective configuration to the config path and exits.

mod config;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;
use roamer_hal::{RetryingActuator, SimBody, SimRobot};
use roamer_runtime::{
    GreedyPlanner, MissionLoop, MissionOutcome, MissionReport, Planner, ScriptedPlanner, init_tracing,
};
use roamer_types::{DirectionTable, ObjectKind};
use tracing::warn;

fn main() -> ExitCode {
    let _tracing = init_tracing("roamer");
    let args: Vec<String> = std::env::args().skip(1).collect();
    let json = args.iter().any(|a| a == "--json");

    let path = config::config_path();
    let cfg = match config::load_from(&path) {
        Ok(Some(cfg)) => {
            println!("  Config loaded from {}", path.display().to_string().bold());
            cfg
        }
        Ok(None) => {
            println!("  No config at {}; using the built-in arena.", path.display().to_string().dimmed());
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            eprintln!("{}: {e}", "Config error".red());
            return ExitCode::FAILURE;
        }
    };

    if args.iter().any(|a| a == "--write-config") {
        return match config::save_to(&cfg, &path) {
            Ok(()) => {
                println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {e}", "Error saving config".red());
                ExitCode::FAILURE
            }
        };
    }

    if let Err(e) = cfg.validate() {
        eprintln!("{}: {e}", "Config error".red());
        return ExitCode::FAILURE;
    }
    let plan = match cfg.scripted_plan() {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("{}: {e}", "Plan error".red());
            return ExitCode::FAILURE;
        }
    };

    // ── Ctrl-C ────────────────────────────────────────────────────────────
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_handler = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping after the current step …".yellow().bold());
        stop_for_handler.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; the mission can only end on its own");
    }

    // ── World and robot ───────────────────────────────────────────────────
    let world = Arc::new(cfg.world());
    let bodies: Vec<SimBody> = cfg
        .objects
        .iter()
        .filter(|o| o.kind != ObjectKind::Robot)
        .map(|o| {
            let radius = if o.is_target() {
                cfg.arena.target_radius
            } else {
                cfg.arena.obstacle_radius
            };
            SimBody::from_object(o, radius)
        })
        .collect();
    let robot = SimRobot::new(cfg.robot.name.clone())
        .at(cfg.robot.start)
        .with_arena(cfg.arena.width, cfg.arena.height)
        .with_convention(cfg.convention)
        .with_bodies(bodies);
    let hw = match RetryingActuator::new(robot, cfg.retry) {
        Ok(hw) => hw,
        Err(e) => {
            eprintln!("{}: {e}", "Hardware error".red());
            return ExitCode::FAILURE;
        }
    };

    let planner: Box<dyn Planner> = if plan.is_empty() {
        println!("  Planner: {}", "greedy".bold());
        Box::new(
            GreedyPlanner::new(world.iter().cloned(), DirectionTable::default())
                .with_max_leg(cfg.planner.max_leg)
                .with_standoff(cfg.planner.standoff),
        )
    } else {
        println!("  Planner: {} ({} actions)", "scripted".bold(), plan.len());
        Box::new(ScriptedPlanner::once(plan))
    };

    let mut mission = MissionLoop::builder(hw, Arc::clone(&world))
        .self_id(cfg.robot.id)
        .convention(cfg.convention)
        .matcher(cfg.matcher)
        .obstacles(cfg.obstacle)
        .safety(cfg.safety)
        .gate(cfg.gate)
        .navigator(cfg.navigator)
        .mission(cfg.mission)
        .planner(planner)
        .stop_flag(stop)
        .build();

    let report = mission.run();
    let sim = mission.hardware().inner();

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("{}: {e}", "Failed to encode report".red()),
        }
    } else {
        print_summary(&report, &sim);
    }

    match report.outcome {
        MissionOutcome::Completed => ExitCode::SUCCESS,
        _ => ExitCode::from(2),
    }
}

fn print_summary(report: &MissionReport, sim: &SimRobot) {
    let outcome = match &report.outcome {
        MissionOutcome::Completed => "completed".green().bold(),
        MissionOutcome::TimedOut => "timed out".yellow().bold(),
        MissionOutcome::Interrupted { reason } => format!("interrupted ({reason})").red().bold(),
    };
    let state = &report.state;

    println!();
    println!("  Mission {}", report.mission_id.to_string().dimmed());
    println!("  Outcome:    {outcome}");
    println!("  Steps:      {} / {}", state.step, state.step_budget);
    println!(
        "  Reached:    {} of {} {:?}",
        state.reached_target_ids.len(),
        state.targets_total,
        state.reached_target_ids
    );
    if !state.identified_target_ids.is_empty() {
        println!("  Identified: {:?}", state.identified_target_ids);
    }
    println!("  Final pose: {}", sim.pose());
    if sim.collisions() > 0 {
        println!("  {} {}", "Collisions:".red(), sim.collisions());
    }
}
