//! Episode loop contract shared by the three simulation variants
//!
//! Per vehicle the state machine is alive → terminated. Each tick updates
//! every alive vehicle once; when the whole population is terminated after
//! those updates the generation advances within the same tick.

use serde::{Deserialize, Serialize};

use crate::SimError;
use crate::frame::RenderFrame;
use crate::stats::GenerationStats;

/// What happened during one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    /// Total ticks run so far, including this one
    pub tick: u64,
    /// Vehicles still alive after the updates
    pub alive: usize,
    /// Loss of the training step run this tick, if any
    pub loss: Option<f32>,
    /// Stats of the generation this tick completed
    pub completed: Option<GenerationStats>,
}

/// Tick-driven simulation owning its population and policy state
pub trait EpisodeLoop {
    /// Advance every alive vehicle one step
    fn tick(&mut self) -> Result<TickReport, SimError>;

    /// Current generation number, starting at 1
    fn generation(&self) -> u32;

    /// Total ticks since construction
    fn ticks(&self) -> u64;

    /// Snapshot for rendering
    fn frame(&self) -> RenderFrame;

    /// Stats of every completed generation, oldest first
    fn history(&self) -> &[GenerationStats];

    /// Run until `generations` more generations complete or `max_ticks`
    /// ticks elapse, whichever comes first
    fn run_for(&mut self, generations: u32, max_ticks: u64) -> Result<u64, SimError> {
        let target = self.generation().saturating_add(generations);
        let mut ran = 0;
        while self.generation() < target && ran < max_ticks {
            self.tick()?;
            ran += 1;
        }
        Ok(ran)
    }
}
