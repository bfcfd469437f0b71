//! Experience replay storage
//!
//! Bounded FIFO of transitions. Pushing past capacity evicts the oldest
//! entry. Minibatches are drawn uniformly with replacement.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::rng::BrainRng;

/// One transition record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub done: bool,
}

/// Bounded FIFO replay buffer
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    entries: VecDeque<Experience>,
    capacity: usize,
    /// Total number of experiences ever pushed
    pushed: u64,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            pushed: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_pushed(&self) -> u64 {
        self.pushed
    }

    /// Append, evicting the oldest entry when over capacity
    pub fn push(&mut self, experience: Experience) {
        self.entries.push_back(experience);
        self.pushed += 1;
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Draw `batch_size` entries independently and uniformly, duplicates allowed
    pub fn sample_with_replacement<'a, R: BrainRng + ?Sized>(
        &'a self,
        batch_size: usize,
        rng: &mut R,
    ) -> Vec<&'a Experience> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        (0..batch_size)
            .map(|_| &self.entries[rng.gen_index(self.entries.len())])
            .collect()
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.entries.iter()
    }

    pub fn oldest(&self) -> Option<&Experience> {
        self.entries.front()
    }

    pub fn newest(&self) -> Option<&Experience> {
        self.entries.back()
    }
}
