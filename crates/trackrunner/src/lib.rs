//! Headless runner for trackrunner simulations
//!
//! - `config`: layered run configuration (defaults, RON file, environment)
//! - `headless`: drives a simulation with a progress bar
//! - `report`: writes the JSON run summary

pub mod config;
pub mod headless;
pub mod report;

pub use config::{Mode, RunConfig, TrackPreset};
pub use headless::HeadlessRunner;
pub use report::RunReport;
