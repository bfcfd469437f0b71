//! JSON report for headless runs
//!
//! Writes `summary.json` (run metadata and per-generation stats) and the
//! effective `config.ron` into the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use trackrunner_core::GenerationStats;

use crate::config::{Mode, RunConfig, TrackPreset};

/// Outcome of one headless run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Timestamp (ISO 8601)
    pub timestamp: String,
    pub version: String,
    pub mode: Mode,
    pub track: TrackPreset,
    pub seed: u64,
    /// Ticks executed
    pub ticks: u64,
    /// Generations completed
    pub generations: usize,
    /// Best score over all generations
    pub best_score: Option<f32>,
    /// Vehicles that reached the finish over the whole run
    pub total_finished: usize,
    pub config: RunConfig,
    pub history: Vec<GenerationStats>,
}

impl RunReport {
    pub fn new(config: &RunConfig, ticks: u64, history: Vec<GenerationStats>) -> Self {
        let best_score = history
            .iter()
            .map(|s| s.best_score)
            .filter(|s| s.is_finite())
            .reduce(f32::max);
        let total_finished = history.iter().map(|s| s.finished).sum();

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            mode: config.run.mode,
            track: config.run.track_preset(),
            seed: config.run.seed,
            ticks,
            generations: history.len(),
            best_score,
            total_finished,
            config: config.clone(),
            history,
        }
    }

    /// Write `summary.json` and `config.ron` into `dir`, returning the
    /// summary path
    pub fn write(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize run report to JSON")?;
        let summary_path = dir.join("summary.json");
        fs::write(&summary_path, json)
            .with_context(|| format!("Failed to write {}", summary_path.display()))?;

        let ron = ron::ser::to_string_pretty(&self.config, ron::ser::PrettyConfig::default())
            .context("Failed to serialize config to RON")?;
        let config_path = dir.join("config.ron");
        fs::write(&config_path, ron)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        log::info!("Report written: {}", summary_path.display());
        Ok(summary_path)
    }

    /// Load a previously written summary
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read report file: {}", path.as_ref().display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON report: {}", path.as_ref().display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackrunner_core::Termination;

    fn stats(generation: u32, best: f32, finished: usize) -> GenerationStats {
        let mut outcomes = vec![(Some(Termination::Crashed), best - 10.0); 3];
        outcomes.extend(vec![(Some(Termination::Finished), best); finished]);
        GenerationStats::collect(generation, 100, outcomes, Some(0.5))
    }

    #[test]
    fn test_report_aggregates_history() {
        let config = RunConfig::default();
        let report = RunReport::new(&config, 250, vec![stats(1, 5.0, 0), stats(2, 40.0, 2)]);

        assert_eq!(report.generations, 2);
        assert_eq!(report.best_score, Some(40.0));
        assert_eq!(report.total_finished, 2);
        assert_eq!(report.track, TrackPreset::Classic);
    }

    #[test]
    fn test_empty_history() {
        let report = RunReport::new(&RunConfig::default(), 0, Vec::new());
        assert_eq!(report.generations, 0);
        assert_eq!(report.best_score, None);
    }

    #[test]
    fn test_write_summary_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let report = RunReport::new(&RunConfig::default(), 12, vec![stats(1, 3.0, 1)]);

        let path = report.write(&out).unwrap();
        assert!(path.ends_with("summary.json"));
        assert!(out.join("config.ron").exists());

        let loaded = RunReport::from_json(&path).unwrap();
        assert_eq!(loaded.ticks, 12);
        assert_eq!(loaded.mode, Mode::Dqn);
        assert_eq!(loaded.history, report.history);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mode"], "dqn");
        assert_eq!(json["history"][0]["finished"], 1);
    }
}
