#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that boots a Midnight Drive session.

mod session;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use midnight_drive_rendering::RenderingBackend;
use midnight_drive_rendering_macroquad::MacroquadBackend;
use midnight_drive_simulation::{Simulation, SimulationConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_DIRECTIVES: &str = "warn,midnight_drive=info";

#[derive(Parser, Debug)]
#[command(name = "midnight-drive", about = "Night-time city driving", version)]
struct Args {
    /// Seed for city generation and traffic
    #[arg(long)]
    seed: Option<u64>,

    /// TOML tuning file; omitted keys keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run this many scripted frames without a window and log a summary
    #[arg(long)]
    headless_frames: Option<u64>,

    /// Synchronise presentation with the display refresh rate
    #[arg(long)]
    vsync: bool,

    /// Log frame timing once per second
    #[arg(long)]
    show_fps: bool,
}

/// Entry point for the Midnight Drive command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load tuning from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    let world_half_extent = config.vehicle.world_half_extent;

    let simulation = Simulation::new(config).context("failed to build the city")?;

    if let Some(frames) = args.headless_frames {
        let summary = session::run_headless(simulation, frames);
        tracing::info!(
            frames = summary.frames,
            collisions = summary.collisions,
            pursuer_hits = summary.pursuer_hits,
            top_speed = summary.top_display_speed,
            distance = summary.distance_travelled,
            "headless run finished"
        );
        return Ok(());
    }

    let presentation = session::presentation(&simulation);
    let mut driver = session::SessionDriver::new(simulation);
    MacroquadBackend::new()
        .with_vsync(args.vsync)
        .with_show_fps(args.show_fps)
        .with_world_half_extent(world_half_extent)
        .run(presentation, move |elapsed, input, scene| {
            driver.advance(elapsed, input, scene);
        })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse() {
        let args = Args::try_parse_from([
            "midnight-drive",
            "--seed",
            "9",
            "--headless-frames",
            "120",
            "--show-fps",
        ])
        .expect("valid arguments");
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.headless_frames, Some(120));
        assert!(args.show_fps);
        assert!(!args.vsync);
        assert!(args.config.is_none());
    }

    #[test]
    fn seed_must_be_numeric() {
        assert!(Args::try_parse_from(["midnight-drive", "--seed", "dusk"]).is_err());
    }
}
