//! Value-based steering agent
//!
//! Epsilon-greedy over a Q-network, trained from a replay buffer with
//! one-step temporal-difference targets. Only the taken action's entry of
//! the target vector is replaced, so non-taken actions get zero gradient.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::BrainError;
use crate::optimizer::Adam;
use crate::qnet::{QNetwork, argmax};
use crate::replay::{Experience, ReplayBuffer};
use crate::rng::BrainRng;

/// Hyperparameters of the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    pub state_size: usize,
    pub action_size: usize,
    pub hidden_layers: Vec<usize>,
    /// Discount factor
    pub gamma: f32,
    /// Initial exploration rate
    pub epsilon: f32,
    /// Exploration floor
    pub epsilon_min: f32,
    /// Multiplicative decay per training step
    pub epsilon_decay: f32,
    pub learning_rate: f32,
    pub batch_size: usize,
    pub memory_capacity: usize,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            state_size: 3,
            action_size: 3,
            hidden_layers: vec![24, 24],
            gamma: 0.95,
            epsilon: 1.0,
            epsilon_min: 0.05,
            epsilon_decay: 0.995,
            learning_rate: 0.001,
            batch_size: 32,
            memory_capacity: 10_000,
        }
    }
}

/// Result of a training step that actually ran
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReplayOutcome {
    /// Batch loss before the update
    pub loss: f32,
    /// Exploration rate after decay
    pub epsilon: f32,
}

/// Q-learning agent with experience replay
#[derive(Debug, Clone)]
pub struct DqnAgent {
    config: DqnConfig,
    network: QNetwork,
    optimizer: Adam,
    memory: ReplayBuffer,
    epsilon: f32,
    train_steps: u64,
}

impl DqnAgent {
    pub fn new<R: BrainRng + ?Sized>(config: DqnConfig, rng: &mut R) -> Self {
        let network = QNetwork::new(
            config.state_size,
            &config.hidden_layers,
            config.action_size,
            rng,
        );
        let optimizer = Adam::new(&network, config.learning_rate);
        let memory = ReplayBuffer::new(config.memory_capacity);
        let epsilon = config.epsilon;

        Self {
            config,
            network,
            optimizer,
            memory,
            epsilon,
            train_steps: 0,
        }
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn network(&self) -> &QNetwork {
        &self.network
    }

    /// Number of training steps that ran (no-op replays excluded)
    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    fn check_state(&self, state: &[f32]) -> Result<(), BrainError> {
        if state.len() != self.config.state_size {
            return Err(BrainError::StateDimension {
                expected: self.config.state_size,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// Q-values of every action for a state
    pub fn q_values(&self, state: &[f32]) -> Result<Vec<f32>, BrainError> {
        self.check_state(state)?;
        Ok(self.network.forward(state))
    }

    /// Epsilon-greedy action selection
    pub fn act<R: BrainRng + ?Sized>(&self, state: &[f32], rng: &mut R) -> Result<usize, BrainError> {
        self.check_state(state)?;
        if rng.check_probability(self.epsilon) {
            return Ok(rng.gen_index(self.config.action_size));
        }
        Ok(argmax(&self.network.forward(state)))
    }

    /// Store a transition. Malformed transitions are rejected, not stored.
    pub fn remember(&mut self, experience: Experience) -> Result<(), BrainError> {
        self.check_state(&experience.state)?;
        self.check_state(&experience.next_state)?;
        if experience.action >= self.config.action_size {
            return Err(BrainError::ActionOutOfRange {
                action: experience.action,
                action_size: self.config.action_size,
            });
        }
        if !experience.reward.is_finite() {
            return Err(BrainError::NonFiniteReward(experience.reward));
        }
        self.memory.push(experience);
        Ok(())
    }

    /// One training step on a minibatch sampled with replacement
    ///
    /// Returns `None` without touching the network or epsilon while the
    /// buffer holds fewer than `batch_size` entries.
    pub fn replay<R: BrainRng + ?Sized>(&mut self, rng: &mut R) -> Option<ReplayOutcome> {
        let batch_size = self.config.batch_size;
        if batch_size == 0 || self.memory.len() < batch_size {
            return None;
        }

        let (state_size, action_size) = (self.config.state_size, self.config.action_size);
        let batch = self.memory.sample_with_replacement(batch_size, rng);

        let mut states = Array2::<f32>::zeros((batch_size, state_size));
        let mut next_states = Array2::<f32>::zeros((batch_size, state_size));
        for (row, experience) in batch.iter().enumerate() {
            states
                .row_mut(row)
                .assign(&ndarray::ArrayView1::from(&experience.state[..]));
            next_states
                .row_mut(row)
                .assign(&ndarray::ArrayView1::from(&experience.next_state[..]));
        }

        let mut targets = self.network.forward_batch(states.view());
        let next_q = self.network.forward_batch(next_states.view());
        debug_assert_eq!(targets.dim(), (batch_size, action_size));

        for (row, experience) in batch.iter().enumerate() {
            let td_target = if experience.done {
                experience.reward
            } else {
                let best_next = next_q
                    .row(row)
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max);
                experience.reward + self.config.gamma * best_next
            };
            targets[[row, experience.action]] = td_target;
        }

        let loss = self
            .network
            .train_batch(states.view(), targets.view(), &mut self.optimizer);

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
        self.train_steps += 1;

        log::trace!(
            "Replay step {}: loss={:.4}, epsilon={:.4}, memory={}",
            self.train_steps,
            loss,
            self.epsilon,
            self.memory.len()
        );

        Some(ReplayOutcome {
            loss,
            epsilon: self.epsilon,
        })
    }
}
