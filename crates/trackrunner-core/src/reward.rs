//! Per-tick reward shaping for the value-based variant
//!
//! Rules in priority order:
//! 1. finish: fixed bonus (exclusive)
//! 2. off track: fixed penalty (exclusive)
//! 3. progress toward the finish, or a small regression penalty
//! 4. idle penalty when the sliding-window displacement is too small
//! 5. proximity penalty per sensor reading above the threshold
//! 6. smoothness bonus or penalty from the heading change
//! 7. non-finite inputs or results collapse to a fixed fallback

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Reward constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub finish_reward: f32,
    pub crash_reward: f32,
    /// Multiplier on distance gained toward the finish
    pub progress_scale: f32,
    /// Added when the vehicle did not get closer
    pub regression_penalty: f32,
    /// Number of recent positions kept
    pub window_len: usize,
    /// Net displacement across the window below which the idle penalty applies
    pub min_window_displacement: f32,
    pub idle_penalty: f32,
    pub proximity_threshold: f32,
    pub proximity_penalty: f32,
    pub smooth_threshold: f32,
    pub smooth_bonus: f32,
    pub fallback_reward: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            finish_reward: 100.0,
            crash_reward: -100.0,
            progress_scale: 10.0,
            regression_penalty: -1.0,
            window_len: 20,
            min_window_displacement: 20.0,
            idle_penalty: 2.0,
            proximity_threshold: 0.7,
            proximity_penalty: 5.0,
            smooth_threshold: 0.01,
            smooth_bonus: 0.5,
            fallback_reward: -10.0,
        }
    }
}

/// Observations the reward is computed from, all taken after the move
#[derive(Debug, Clone, Copy)]
pub struct RewardInputs<'a> {
    pub position: Vec2,
    pub distance_to_finish: f32,
    pub on_finish: bool,
    pub on_track: bool,
    pub sensors: &'a [f32],
    pub heading_change: f32,
}

/// Stateful reward calculator owned by one vehicle
#[derive(Debug, Clone)]
pub struct RewardShaper {
    config: RewardConfig,
    last_distance: f32,
    window: VecDeque<Vec2>,
}

impl RewardShaper {
    pub fn new(config: RewardConfig, initial_distance: f32) -> Self {
        let window = VecDeque::with_capacity(config.window_len + 1);
        Self {
            config,
            last_distance: initial_distance,
            window,
        }
    }

    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Distance to the finish recorded on the previous tick
    pub fn last_distance(&self) -> f32 {
        self.last_distance
    }

    /// Net displacement between the oldest and newest window entries
    pub fn window_displacement(&self) -> f32 {
        match (self.window.front(), self.window.back()) {
            (Some(first), Some(last)) => first.distance(*last),
            _ => 0.0,
        }
    }

    /// Compute this tick's reward and update the shaper's state
    pub fn evaluate(&mut self, inputs: &RewardInputs<'_>) -> f32 {
        let delta = self.last_distance - inputs.distance_to_finish;
        self.last_distance = inputs.distance_to_finish;

        self.window.push_back(inputs.position);
        while self.window.len() > self.config.window_len {
            self.window.pop_front();
        }

        let degenerate = !inputs.position.is_finite()
            || !inputs.heading_change.is_finite()
            || inputs.sensors.iter().any(|s| !s.is_finite());
        if degenerate {
            log::warn!(
                "Non-finite reward inputs (position={:?}, heading_change={}, sensors={:?}), using fallback {}",
                inputs.position,
                inputs.heading_change,
                inputs.sensors,
                self.config.fallback_reward
            );
            return self.config.fallback_reward;
        }

        if inputs.on_finish {
            return self.config.finish_reward;
        }
        if !inputs.on_track {
            return self.config.crash_reward;
        }

        let mut reward = if delta > 0.0 {
            delta * self.config.progress_scale
        } else {
            self.config.regression_penalty
        };

        if self.window_displacement() < self.config.min_window_displacement {
            reward -= self.config.idle_penalty;
        }

        let near_misses = inputs
            .sensors
            .iter()
            .filter(|&&s| s > self.config.proximity_threshold)
            .count();
        reward -= near_misses as f32 * self.config.proximity_penalty;

        if inputs.heading_change.abs() < self.config.smooth_threshold {
            reward += self.config.smooth_bonus;
        } else {
            reward -= self.config.smooth_bonus;
        }

        if !reward.is_finite() {
            log::warn!(
                "Non-finite reward {} (delta={}), using fallback {}",
                reward,
                delta,
                self.config.fallback_reward
            );
            return self.config.fallback_reward;
        }
        reward
    }
}
