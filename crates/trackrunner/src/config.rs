//! Run configuration with layered loading
//!
//! Configuration is loaded from multiple sources (lowest to highest priority):
//! 1. Compiled defaults
//! 2. `trackrunner.ron` file (if exists), or an explicit file
//! 3. Environment variables prefixed with `TRACKRUNNER_`
//!
//! Example environment variable: `TRACKRUNNER_DQN__TRAIN_INTERVAL=10`
//!
//! Command-line flags are applied on top by the binary.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use trackrunner_brain::{DqnConfig, EvolutionConfig};
use trackrunner_core::{
    AgentSharing, DqnSimConfig, EvolutionSimConfig, FitnessConfig, WorkerSimConfig,
};
use trackrunner_track::TrackLayout;

/// Which simulation variant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Value-based agent on the simulation thread
    Dqn,
    /// Value-based agent on a background worker
    Worker,
    /// Genetic algorithm over steering networks
    Evolve,
}

/// Built-in track presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TrackPreset {
    Classic,
    Ring,
}

impl TrackPreset {
    /// Preset a mode runs on unless told otherwise
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Dqn | Mode::Worker => TrackPreset::Classic,
            Mode::Evolve => TrackPreset::Ring,
        }
    }

    pub fn layout(self) -> TrackLayout {
        match self {
            TrackPreset::Classic => TrackLayout::classic(),
            TrackPreset::Ring => TrackLayout::ring(),
        }
    }
}

/// Main run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunConfig {
    #[serde(default)]
    pub run: RunSettings,

    #[serde(default)]
    pub dqn: DqnSettings,

    #[serde(default)]
    pub evolution: EvolutionSettings,
}

/// What to run and for how long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub mode: Mode,
    /// Track preset; defaults to the mode's preset
    #[serde(default)]
    pub track: Option<TrackPreset>,
    pub seed: u64,
    /// Stop after this many completed generations
    pub generations: u32,
    /// Stop after this many ticks regardless of generations
    pub max_ticks: u64,
    /// Directory for the run report
    pub output: String,
    /// Show a progress bar
    pub progress: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            mode: Mode::Dqn,
            track: None,
            seed: 42,
            generations: 50,
            max_ticks: 200_000,
            output: "trackrunner_output".to_string(),
            progress: true,
        }
    }
}

impl RunSettings {
    pub fn track_preset(&self) -> TrackPreset {
        self.track.unwrap_or_else(|| TrackPreset::for_mode(self.mode))
    }
}

/// Value-based variant settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnSettings {
    pub population: usize,
    pub train_interval: u64,
    pub sharing: AgentSharing,
    /// Per-vehicle step budget (none by default)
    #[serde(default)]
    pub max_steps: Option<u32>,
    pub gamma: f32,
    pub epsilon_min: f32,
    pub epsilon_decay: f32,
    pub learning_rate: f32,
    pub batch_size: usize,
    pub memory_capacity: usize,
    /// Worker mode only
    pub response_timeout_ms: u64,
    /// Worker mode only
    pub stall_limit_ticks: u64,
}

impl Default for DqnSettings {
    fn default() -> Self {
        Self {
            population: 10,
            train_interval: 5,
            sharing: AgentSharing::Shared,
            max_steps: None,
            gamma: 0.95,
            epsilon_min: 0.05,
            epsilon_decay: 0.995,
            learning_rate: 0.001,
            batch_size: 32,
            memory_capacity: 10_000,
            response_timeout_ms: 250,
            stall_limit_ticks: 600,
        }
    }
}

/// Evolutionary variant settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSettings {
    pub population: usize,
    pub survivor_fraction: f32,
    pub mutation_rate: f32,
    pub mutation_magnitude: f32,
    /// Step budget per vehicle
    pub max_time: u32,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            population: 50,
            survivor_fraction: 0.2,
            mutation_rate: 0.3,
            mutation_magnitude: 0.5,
            max_time: 500,
        }
    }
}

impl RunConfig {
    /// Load configuration with layered priority:
    /// 1. Compiled defaults (lowest priority)
    /// 2. `file`, or `trackrunner.ron` if it exists
    /// 3. Environment variables prefixed with `TRACKRUNNER_` (highest priority)
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).format(FileFormat::Ron).required(true),
            None => File::with_name("trackrunner")
                .format(FileFormat::Ron)
                .required(false),
        };

        let builder = Config::builder()
            // Layer 1: Compiled defaults
            .set_default("run.mode", "dqn")?
            .set_default("run.seed", 42_i64)?
            .set_default("run.generations", 50_i64)?
            .set_default("run.max_ticks", 200_000_i64)?
            .set_default("run.output", "trackrunner_output")?
            .set_default("run.progress", true)?
            .set_default("dqn.population", 10_i64)?
            .set_default("dqn.train_interval", 5_i64)?
            .set_default("dqn.sharing", "shared")?
            .set_default("dqn.gamma", 0.95)?
            .set_default("dqn.epsilon_min", 0.05)?
            .set_default("dqn.epsilon_decay", 0.995)?
            .set_default("dqn.learning_rate", 0.001)?
            .set_default("dqn.batch_size", 32_i64)?
            .set_default("dqn.memory_capacity", 10_000_i64)?
            .set_default("dqn.response_timeout_ms", 250_i64)?
            .set_default("dqn.stall_limit_ticks", 600_i64)?
            .set_default("evolution.population", 50_i64)?
            .set_default("evolution.survivor_fraction", 0.2)?
            .set_default("evolution.mutation_rate", 0.3)?
            .set_default("evolution.mutation_magnitude", 0.5)?
            .set_default("evolution.max_time", 500_i64)?
            // Layer 2: Config file
            .add_source(file_source)
            // Layer 3: Environment variables (TRACKRUNNER_RUN__SEED, etc.)
            .add_source(Environment::with_prefix("TRACKRUNNER").separator("__"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Settings for the synchronous value-based simulation
    pub fn dqn_sim(&self) -> DqnSimConfig {
        let dqn = &self.dqn;
        DqnSimConfig {
            population: dqn.population,
            train_interval: dqn.train_interval,
            sharing: dqn.sharing,
            max_steps: dqn.max_steps,
            agent: DqnConfig {
                gamma: dqn.gamma,
                epsilon_min: dqn.epsilon_min,
                epsilon_decay: dqn.epsilon_decay,
                learning_rate: dqn.learning_rate,
                batch_size: dqn.batch_size,
                memory_capacity: dqn.memory_capacity,
                ..DqnConfig::default()
            },
            ..DqnSimConfig::default()
        }
    }

    /// Settings for the worker simulation (the agent is always shared)
    pub fn worker_sim(&self) -> WorkerSimConfig {
        WorkerSimConfig {
            sim: DqnSimConfig {
                sharing: AgentSharing::Shared,
                ..self.dqn_sim()
            },
            response_timeout_ms: self.dqn.response_timeout_ms,
            stall_limit_ticks: self.dqn.stall_limit_ticks,
        }
    }

    pub fn evolution_sim(&self) -> EvolutionSimConfig {
        let evolution = &self.evolution;
        EvolutionSimConfig {
            population: evolution.population,
            fitness: FitnessConfig {
                max_time: evolution.max_time,
                ..FitnessConfig::default()
            },
            evolution: EvolutionConfig {
                survivor_fraction: evolution.survivor_fraction,
                mutation_rate: evolution.mutation_rate,
                mutation_magnitude: evolution.mutation_magnitude,
                ..EvolutionConfig::default()
            },
            ..EvolutionSimConfig::default()
        }
    }
}
