//! # CTP Supervisor
//!
//! Drives the control engine on a fixed cycle against a plant I/O
//! backend, and logs a telemetry line-protocol record on the reporting
//! interval. The engine itself is pure; everything time- and
//! I/O-shaped lives here.

mod sim;

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ctp_common::config::{ConfigError, ConfigLoader, SharedConfig};
use ctp_common::io::PlantIo;
use ctp_common::{telemetry, Stamp, UiCommands};
use ctp_control_unit::{step, EngineConfig, PlantState};

use crate::sim::SimPlant;

/// CTP plant supervisor.
#[derive(Debug, Parser)]
#[command(name = "ctp-supervisor", version, about)]
struct Args {
    /// Path to the supervisor TOML configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Control cycle period [s].
    #[arg(long, default_value_t = 7.0)]
    cycle_secs: f64,

    /// Telemetry reporting interval [s].
    #[arg(long, default_value_t = 45)]
    report_secs: u64,

    /// Run against the built-in plant simulation.
    #[arg(long)]
    dry_run: bool,

    /// Outdoor temperature for the simulation backend [°F].
    #[arg(long, default_value_t = 80.0)]
    sim_outdoor: f64,
}

/// Supervisor TOML file: `[shared]` identity plus the full `[engine]`
/// block (all engine fields optional, defaults are the commissioning
/// sheet).
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SupervisorConfig {
    shared: SharedConfig,
    engine: EngineConfig,
}

fn load_config(args: &Args) -> Result<SupervisorConfig, ConfigError> {
    let cfg = match &args.config {
        Some(path) => SupervisorConfig::load(path)?,
        None => SupervisorConfig::default(),
    };
    cfg.shared.validate()?;
    cfg.engine.validate()?;
    Ok(cfg)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let cfg = match load_config(&args) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cfg.shared.log_level.as_filter())),
        )
        .init();

    if !args.dry_run {
        // Hardware drivers live out of tree; until one is linked in, the
        // simulation backend is the only option.
        warn!("no hardware backend linked, falling back to simulation");
    }
    let mut io: Box<dyn PlantIo> = Box::new(SimPlant::new(args.sim_outdoor));

    info!(
        service = %cfg.shared.service_name,
        backend = io.name(),
        cycle_secs = args.cycle_secs,
        report_secs = args.report_secs,
        "supervisor starting"
    );

    if let Err(e) = io.init() {
        error!(error = %e, "I/O backend init failed");
        std::process::exit(1);
    }

    run_loop(&args, &cfg, io.as_mut()).await;

    if let Err(e) = io.shutdown() {
        error!(error = %e, "I/O backend shutdown failed");
    }
    info!("supervisor stopped");
}

async fn run_loop(args: &Args, cfg: &SupervisorConfig, io: &mut dyn PlantIo) {
    let mut state = PlantState::default();
    let mut cycle = interval(Duration::from_secs_f64(args.cycle_secs));
    cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let report_every = (args.report_secs as f64 / args.cycle_secs).max(1.0) as u64;
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            _ = cycle.tick() => {}
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                return;
            }
        }

        let raw = match io.read() {
            Ok(raw) => raw,
            Err(e) => {
                // A failed acquisition skips the cycle; the engine's
                // last-known-good handling covers the gap on the next one.
                error!(error = %e, "acquisition failed, skipping cycle");
                continue;
            }
        };

        let now = Stamp::now();
        let out = step(&cfg.engine, now, &raw, &UiCommands::default(), &mut state);

        if let Err(e) = io.apply(&out) {
            error!(error = %e, "actuation failed");
        }

        cycles += 1;
        if cycles % report_every == 0 {
            let line = telemetry::encode_line(&cfg.shared.service_name, &out);
            info!(target: "telemetry", "{line}");
        }
    }
}
