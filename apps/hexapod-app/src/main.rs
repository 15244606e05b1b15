//! Hexapod locomotion CLI.
//!
//! Provides three modes of operation:
//! - `walk`: Run the robot headless toward a target and print statistics
//! - `solve`: One-shot IK for a single leg
//! - `info`: Print crate versions and the default configuration

use std::path::PathBuf;
use std::process::ExitCode;

use bevy::prelude::*;
use clap::{Parser, Subcommand, ValueEnum};
use nalgebra::Vector3;
use serde::Serialize;
use tracing::{error, info};

use hexapod_core::config::{HexapodConfig, SolverChoice};
use hexapod_core::error::HexapodError;
use hexapod_core::time::SimTime;
use hexapod_gait::GaitSnapshot;
use hexapod_ik::{LegAngles, Reach};
use hexapod_sim::{BodyPose, HexapodRobot, HexapodSimPlugin, RobotAssembly, TargetPoint, WalkStats};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Hexapod locomotion core.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Leg IK strategy, overriding the configuration.
    #[arg(short, long, global = true)]
    solver: Option<SolverArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk toward a ground point and print statistics.
    Walk {
        /// Target point on the ground plane (x z).
        #[arg(short, long, num_args = 2, value_names = ["X", "Z"], allow_negative_numbers = true, default_values_t = [0.0, 2.0])]
        target: Vec<f32>,

        /// Simulated seconds to run.
        #[arg(long, default_value_t = 5.0)]
        seconds: f32,

        /// Frame delta, overriding `frame_dt` from the configuration.
        #[arg(long)]
        dt: Option<f32>,

        /// Print a JSON report instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Solve one leg toward a world point without moving the robot.
    Solve {
        /// Leg index (0..6).
        #[arg(short, long)]
        leg: usize,

        /// World-space foot target (x y z).
        #[arg(short, long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true, required = true)]
        target: Vec<f32>,
    },

    /// Print crate information.
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
enum SolverArg {
    Analytic,
    Fabrik,
}

impl From<SolverArg> for SolverChoice {
    fn from(arg: SolverArg) -> Self {
        match arg {
            SolverArg::Analytic => Self::Analytic,
            SolverArg::Fabrik => Self::Fabrik,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct WalkReport {
    body: BodyPose,
    stats: WalkStats,
    gait: GaitSnapshot,
}

#[derive(Serialize)]
struct SolveReport {
    leg: usize,
    target: [f32; 3],
    angles: LegAngles,
    reach: Reach,
    reached: [f32; 3],
    limited: [bool; 3],
    iterations: u32,
}

// ---------------------------------------------------------------------------
// Mode implementations
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<HexapodConfig, HexapodError> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            HexapodConfig::from_file(path)?
        }
        None => HexapodConfig::default(),
    };
    if let Some(solver) = cli.solver {
        config.solver.kind = solver.into();
    }
    Ok(config)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn run_walk(
    mut config: HexapodConfig,
    target: Vector3<f32>,
    seconds: f32,
    dt: Option<f32>,
    json: bool,
) -> Result<(), HexapodError> {
    if let Some(dt) = dt {
        config.frame_dt = dt;
    }
    config.validate()?;
    let frames = (seconds.max(0.0) / config.frame_dt).ceil() as usize;

    let mut app = App::new();
    app.add_plugins(HexapodSimPlugin)
        .insert_resource(config)
        .insert_resource(TargetPoint(target));
    app.finish();
    app.cleanup();

    info!(frames, x = target.x, z = target.z, "walking");
    for _ in 0..frames {
        app.update();
    }

    let robot = &app.world().resource::<HexapodRobot>().0;
    let stats = app.world().resource::<WalkStats>().clone();
    let body = *robot.body_pose();

    if json {
        let report = WalkReport {
            body,
            stats,
            gait: robot.gait_debug_snapshot(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(e) => error!("failed to encode report: {e}"),
        }
        return Ok(());
    }

    let [x, _, z] = body.position;
    println!("clock: {}", app.world().resource::<SimTime>());
    println!("body: x={x:.3} z={z:.3} yaw={:.3}", body.yaw);
    println!(
        "frames={} time={:.2}s distance={:.3} speed={:.3}",
        stats.frames,
        stats.sim_seconds,
        stats.distance,
        stats.mean_speed().unwrap_or(0.0)
    );
    println!(
        "steps={} plans={} stretched_solves={}",
        stats.steps_completed, stats.plans_completed, stats.stretched_solves
    );
    Ok(())
}

fn run_solve(config: HexapodConfig, leg: usize, target: Vector3<f32>) -> Result<(), HexapodError> {
    let robot = RobotAssembly::new(config)?;
    let solution = robot.solve_leg(leg, &target)?;
    let reached = robot.legs()[leg].forward_foot(robot.graph(), &solution.angles);

    let report = SolveReport {
        leg,
        target: target.into(),
        angles: solution.angles,
        reach: solution.reach,
        reached: reached.into(),
        limited: solution.limited,
        iterations: solution.iterations,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => error!("failed to encode report: {e}"),
    }
    Ok(())
}

fn run_info(config: &HexapodConfig) {
    println!("hexapod v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  hexapod-core  {}", env!("CARGO_PKG_VERSION"));
    println!("  hexapod-scene {}", env!("CARGO_PKG_VERSION"));
    println!("  hexapod-ik    {}", env!("CARGO_PKG_VERSION"));
    println!("  hexapod-gait  {}", env!("CARGO_PKG_VERSION"));
    println!("  hexapod-sim   {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!(
        "legs: coxa={} femur={} tibia={} (reach {:.2})",
        config.leg.coxa_length,
        config.leg.femur_length,
        config.leg.tibia_length,
        config.leg.max_reach()
    );
    println!(
        "gait: swing={}s step_height={} max_foot_distance={}",
        config.gait.swing_duration, config.gait.step_height, config.gait.max_foot_distance
    );
    println!("solver: {:?}", config.solver.kind);
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Some(Commands::Walk {
            target,
            seconds,
            dt,
            json,
        }) => run_walk(
            config,
            Vector3::new(target[0], 0.0, target[1]),
            seconds,
            dt,
            json,
        ),
        Some(Commands::Solve { leg, target }) => run_solve(
            config,
            leg,
            Vector3::new(target[0], target[1], target[2]),
        ),
        Some(Commands::Info) => {
            run_info(&config);
            Ok(())
        }
        None => run_walk(config, Vector3::new(0.0, 0.0, 2.0), 5.0, None, false),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
