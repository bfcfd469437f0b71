use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use trackrunner::{HeadlessRunner, Mode, RunConfig, TrackPreset};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulation variant
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Track preset (defaults to classic for dqn/worker, ring for evolve)
    #[arg(long, value_enum)]
    track: Option<TrackPreset>,

    /// Number of generations to run
    #[arg(long)]
    generations: Option<u32>,

    /// Upper bound on simulation ticks
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Seed for every random decision
    #[arg(long)]
    seed: Option<u64>,

    /// Output directory for the run report
    #[arg(long)]
    output: Option<PathBuf>,

    /// Configuration file (RON); defaults to ./trackrunner.ron if present
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    quiet: bool,
}

impl Args {
    /// Flags take priority over every configuration layer
    fn apply(&self, config: &mut RunConfig) {
        if let Some(mode) = self.mode {
            config.run.mode = mode;
        }
        if let Some(track) = self.track {
            config.run.track = Some(track);
        }
        if let Some(generations) = self.generations {
            config.run.generations = generations;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.run.max_ticks = max_ticks;
        }
        if let Some(seed) = self.seed {
            config.run.seed = seed;
        }
        if let Some(output) = &self.output {
            config.run.output = output.display().to_string();
        }
        if self.quiet {
            config.run.progress = false;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = RunConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);

    log::info!("Starting trackrunner");
    log::info!("  Mode: {:?}", config.run.mode);
    log::info!("  Track: {:?}", config.run.track_preset());
    log::info!("  Generations: {}", config.run.generations);
    log::info!("  Output: {}", config.run.output);

    let runner = HeadlessRunner::new(config);
    let report = runner.run()?;
    report.write(&runner.config().run.output)?;

    log::info!(
        "Done: {} generations, {} ticks, best score {}, {} finishes",
        report.generations,
        report.ticks,
        report
            .best_score
            .map_or_else(|| "n/a".to_string(), |best| format!("{:.2}", best)),
        report.total_finished
    );
    Ok(())
}
