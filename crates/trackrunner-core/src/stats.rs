//! Per-generation statistics

use serde::{Deserialize, Serialize};

use crate::vehicle::Termination;

/// Outcome summary of one completed generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generation: u32,
    /// Ticks the generation ran for
    pub ticks: u64,
    pub population: usize,
    pub finished: usize,
    pub crashed: usize,
    pub timed_out: usize,
    pub stalled: usize,
    pub policy_failures: usize,
    /// Best total reward or fitness (NaN scores ignored)
    pub best_score: f32,
    pub mean_score: f32,
    /// Exploration rate at generation end (value-based variants)
    pub epsilon: Option<f32>,
}

impl GenerationStats {
    /// Summarize `(termination, score)` pairs of a population
    pub fn collect<I>(generation: u32, ticks: u64, outcomes: I, epsilon: Option<f32>) -> Self
    where
        I: IntoIterator<Item = (Option<Termination>, f32)>,
    {
        let mut stats = Self {
            generation,
            ticks,
            population: 0,
            finished: 0,
            crashed: 0,
            timed_out: 0,
            stalled: 0,
            policy_failures: 0,
            best_score: f32::NEG_INFINITY,
            mean_score: 0.0,
            epsilon,
        };

        let mut total = 0.0;
        let mut scored = 0usize;
        for (termination, score) in outcomes {
            stats.population += 1;
            match termination {
                Some(Termination::Finished) => stats.finished += 1,
                Some(Termination::Crashed) => stats.crashed += 1,
                Some(Termination::TimedOut) => stats.timed_out += 1,
                Some(Termination::Stalled) => stats.stalled += 1,
                Some(Termination::PolicyFailure) => stats.policy_failures += 1,
                None => {}
            }
            if score.is_finite() {
                total += score;
                scored += 1;
                stats.best_score = stats.best_score.max(score);
            }
        }

        if scored == 0 {
            stats.best_score = 0.0;
        } else {
            stats.mean_score = total / scored as f32;
        }
        stats
    }

    /// Fraction of the population that reached the finish
    pub fn finish_rate(&self) -> f32 {
        if self.population == 0 {
            0.0
        } else {
            self.finished as f32 / self.population as f32
        }
    }
}
