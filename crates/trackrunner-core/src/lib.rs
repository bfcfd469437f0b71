//! Simulation core for trackrunner
//!
//! This crate implements:
//! - Vehicle kinematics and ray sensors against a `TrackSurface`
//! - Per-tick reward shaping for the value-based variant
//! - Learner (value-based) and evolved (genetic) vehicles
//! - Three episode loops: synchronous DQN, evolutionary, and DQN with the
//!   agent on a background worker thread
//! - Render frames and per-generation statistics

pub mod dqn_sim;
pub mod episode;
pub mod evolution_sim;
pub mod evolved;
pub mod frame;
pub mod learner;
pub mod reward;
pub mod stats;
pub mod vehicle;
pub mod worker;
pub mod worker_sim;

pub use dqn_sim::{AgentSharing, DqnSimConfig, DqnSimulation};
pub use episode::{EpisodeLoop, TickReport};
pub use evolution_sim::{EvolutionSimConfig, EvolutionSimulation};
pub use evolved::{EvolvedCar, FitnessConfig};
pub use frame::{RenderFrame, VehicleFrame};
pub use learner::LearnerCar;
pub use reward::{RewardConfig, RewardInputs, RewardShaper};
pub use stats::GenerationStats;
pub use vehicle::{SensorHit, SteeringAction, Termination, Vehicle, VehicleConfig};
pub use worker::{PolicyWorker, WorkerRequest, WorkerResponse};
pub use worker_sim::{WorkerSimConfig, WorkerSimulation};

use trackrunner_brain::BrainError;
use trackrunner_track::TrackError;

/// Errors raised by simulations
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("policy worker disconnected")]
    WorkerDisconnected,

    #[error("failed to spawn policy worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Brain(#[from] BrainError),
}
