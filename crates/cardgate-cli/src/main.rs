//! # cardgate simulator
//!
//! Runs the door controller on simulated hardware.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use cardgate_cli::scenario::Scenario;
use cardgate_cli::sim::{Frame, Simulator};
use cardgate_cli::{load_config, print_layout};
use cardgate_controller::ControllerConfig;

/// NFC door controller simulator.
#[derive(Parser, Debug)]
#[command(name = "cardgate", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a JSON scenario against a simulated controller.
    Run(RunArgs),
    /// Print the persistent storage layout.
    Layout {
        /// Controller configuration (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario file.
    scenario: PathBuf,

    /// Controller configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated milliseconds per control cycle.
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Pace the control cycle in wall-clock time.
    #[arg(long)]
    realtime: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Layout { config } => {
            let config = config_from(config.as_deref())?;
            print_layout(&config);
            Ok(())
        }
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let config = config_from(args.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;
    tracing::info!(
        steps = scenario.steps.len(),
        simulated_ms = scenario.duration_ms(),
        "Scenario loaded"
    );

    let mut sim = Simulator::new(config, Duration::from_millis(args.tick_ms), args.realtime)
        .context("starting simulator")?;
    let frames = sim.run(&scenario).await?;

    for frame in &frames {
        print_frame(frame);
    }
    println!(
        "{} cards stored, door {}",
        sim.controller().store().count(),
        if sim.controller().door().is_unlocked() {
            "unlocked"
        } else {
            "locked"
        }
    );
    Ok(())
}

fn config_from(path: Option<&std::path::Path>) -> anyhow::Result<ControllerConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(ControllerConfig::default()),
    }
}

fn print_frame(frame: &Frame) {
    println!(
        "[{:>7} ms] {:<22} {:<14} |{}|{}|",
        frame.elapsed_ms, frame.step, frame.state, frame.lcd[0], frame.lcd[1]
    );
}
