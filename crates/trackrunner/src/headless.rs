//! Headless run driver
//!
//! Builds the simulation for the configured mode and ticks it until the
//! generation or tick limit is reached, reporting progress per generation.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use trackrunner_core::{
    DqnSimulation, EpisodeLoop, EvolutionSimulation, GenerationStats, WorkerSimulation,
};

use crate::config::{Mode, RunConfig};
use crate::report::RunReport;

/// Runs one simulation to completion without rendering
pub struct HeadlessRunner {
    config: RunConfig,
}

impl HeadlessRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Create the progress bar style
    fn progress_style() -> Result<ProgressStyle> {
        Ok(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} gen ({eta}) {msg}",
        )
        .context("Invalid progress bar template")?
        .progress_chars("█▓░"))
    }

    fn build_simulation(&self) -> Result<Box<dyn EpisodeLoop>> {
        let layout = self.config.run.track_preset().layout();
        let seed = self.config.run.seed;

        let sim: Box<dyn EpisodeLoop> = match self.config.run.mode {
            Mode::Dqn => Box::new(
                DqnSimulation::new(layout, self.config.dqn_sim(), seed)
                    .context("Failed to create DQN simulation")?,
            ),
            Mode::Worker => Box::new(
                WorkerSimulation::new(layout, self.config.worker_sim(), seed)
                    .context("Failed to create worker simulation")?,
            ),
            Mode::Evolve => Box::new(
                EvolutionSimulation::new(layout, self.config.evolution_sim(), seed)
                    .context("Failed to create evolution simulation")?,
            ),
        };
        Ok(sim)
    }

    /// Run until the generation or tick limit and build the report
    pub fn run(&self) -> Result<RunReport> {
        let run = &self.config.run;
        let mut sim = self.build_simulation()?;

        let pb = if run.progress {
            let pb = ProgressBar::new(u64::from(run.generations));
            pb.set_style(Self::progress_style()?);
            pb.enable_steady_tick(std::time::Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        log::info!(
            "Starting {:?} run on '{}' track: {} generations, at most {} ticks, seed {}",
            run.mode,
            run.track_preset().layout().name,
            run.generations,
            run.max_ticks,
            run.seed
        );

        let mut completed = 0u32;
        while completed < run.generations && sim.ticks() < run.max_ticks {
            let report = sim.tick().context("Simulation tick failed")?;
            if let Some(stats) = report.completed {
                completed += 1;
                pb.inc(1);
                pb.set_message(Self::summary_line(&stats));
            }
        }

        if completed < run.generations {
            log::warn!(
                "Tick limit {} reached after {} of {} generations",
                run.max_ticks,
                completed,
                run.generations
            );
        }
        pb.finish_with_message(format!("{} generations in {} ticks", completed, sim.ticks()));

        Ok(RunReport::new(&self.config, sim.ticks(), sim.history().to_vec()))
    }

    fn summary_line(stats: &GenerationStats) -> String {
        let mut line = format!(
            "best={:.1} mean={:.1} finished={}/{}",
            stats.best_score, stats.mean_score, stats.finished, stats.population
        );
        if let Some(epsilon) = stats.epsilon {
            line.push_str(&format!(" eps={:.3}", epsilon));
        }
        line
    }
}
