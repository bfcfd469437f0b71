//! Steering policies for trackrunner
//!
//! This crate implements:
//! - An injectable RNG trait so every random branch is reproducible
//! - A Q-network with backpropagation and Adam, trained by a DQN agent
//!   from a bounded replay buffer
//! - An evolvable steering network and truncation-selection breeder

pub mod dqn;
pub mod evolution;
pub mod optimizer;
pub mod qnet;
pub mod replay;
pub mod rng;
pub mod steering;

pub use dqn::{DqnAgent, DqnConfig, ReplayOutcome};
pub use evolution::{Breeder, EvolutionConfig};
pub use optimizer::Adam;
pub use qnet::QNetwork;
pub use replay::{Experience, ReplayBuffer};
pub use rng::{BrainRng, seeded};
pub use steering::SteeringNetwork;

/// Errors raised at the policy boundary
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BrainError {
    #[error("state has {actual} values, expected {expected}")]
    StateDimension { expected: usize, actual: usize },

    #[error("action {action} out of range for {action_size} actions")]
    ActionOutOfRange { action: usize, action_size: usize },

    #[error("reward {0} is not finite")]
    NonFiniteReward(f32),
}
