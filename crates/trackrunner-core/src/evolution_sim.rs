//! Evolutionary simulation
//!
//! Vehicles are stepped in parallel (each only reads the track and owns its
//! brain). When the whole population is terminated the survivors are
//! selected and the next generation is bred from them.

use glam::Vec2;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use trackrunner_brain::{BrainRng, Breeder, EvolutionConfig, SteeringNetwork, seeded};
use trackrunner_track::{TrackLayout, TrackSurface};

use crate::SimError;
use crate::episode::{EpisodeLoop, TickReport};
use crate::evolved::{EvolvedCar, FitnessConfig};
use crate::frame::RenderFrame;
use crate::stats::GenerationStats;
use crate::vehicle::VehicleConfig;

/// Population and spawn parameters of the evolutionary variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSimConfig {
    pub population: usize,
    pub spawn: Vec2,
    /// Spawn position jitter per axis, uniform in [-jitter, jitter)
    pub spawn_jitter: f32,
    /// Initial heading jitter, uniform in [-jitter, jitter)
    pub heading_jitter: f32,
    pub vehicle: VehicleConfig,
    pub fitness: FitnessConfig,
    pub evolution: EvolutionConfig,
}

impl Default for EvolutionSimConfig {
    fn default() -> Self {
        Self {
            population: 50,
            spawn: Vec2::new(150.0, 150.0),
            spawn_jitter: 10.0,
            heading_jitter: 0.1,
            vehicle: VehicleConfig::evolved(),
            fitness: FitnessConfig::default(),
            evolution: EvolutionConfig::default(),
        }
    }
}

/// Genetic-algorithm simulation over steering networks
pub struct EvolutionSimulation<T: TrackSurface = TrackLayout> {
    config: EvolutionSimConfig,
    track: T,
    breeder: Breeder,
    cars: Vec<EvolvedCar>,
    survivors: Vec<SteeringNetwork>,
    rng: Xoshiro256StarStar,
    generation: u32,
    ticks: u64,
    generation_ticks: u64,
    history: Vec<GenerationStats>,
}

impl<T: TrackSurface> EvolutionSimulation<T> {
    pub fn new(track: T, config: EvolutionSimConfig, seed: u64) -> Result<Self, SimError> {
        track.check_invariants()?;

        let breeder = Breeder::new(EvolutionConfig {
            input_dim: config.vehicle.sensor_count(),
            ..config.evolution.clone()
        });
        let mut sim = Self {
            config,
            track,
            breeder,
            cars: Vec::new(),
            survivors: Vec::new(),
            rng: seeded(seed),
            generation: 1,
            ticks: 0,
            generation_ticks: 0,
            history: Vec::new(),
        };
        sim.populate();

        log::info!(
            "Evolution simulation: {} vehicles, {} survivors per generation",
            sim.config.population,
            sim.breeder.survivor_count(sim.config.population)
        );
        Ok(sim)
    }

    pub fn config(&self) -> &EvolutionSimConfig {
        &self.config
    }

    pub fn track(&self) -> &T {
        &self.track
    }

    pub fn cars(&self) -> &[EvolvedCar] {
        &self.cars
    }

    /// Template brains selected at the last generation change
    pub fn survivors(&self) -> &[SteeringNetwork] {
        &self.survivors
    }

    pub fn alive_count(&self) -> usize {
        self.cars.iter().filter(|c| c.is_alive()).count()
    }

    /// Breed brains from the current survivors and spawn them
    fn populate(&mut self) {
        let brains = self
            .breeder
            .next_generation(&self.survivors, self.config.population, &mut self.rng);

        self.cars = brains
            .into_iter()
            .map(|brain| {
                let jitter = Vec2::new(
                    self.rng.gen_symmetric(self.config.spawn_jitter),
                    self.rng.gen_symmetric(self.config.spawn_jitter),
                );
                let heading = self.rng.gen_symmetric(self.config.heading_jitter);
                EvolvedCar::new(
                    &self.track,
                    self.config.spawn + jitter,
                    heading,
                    self.config.vehicle.clone(),
                    brain,
                    self.config.fitness.clone(),
                )
            })
            .collect();
    }

    fn advance_generation(&mut self) -> GenerationStats {
        let stats = GenerationStats::collect(
            self.generation,
            self.generation_ticks,
            self.cars
                .iter()
                .map(|c| (c.vehicle.termination, c.fitness())),
            None,
        );
        log::info!(
            "Generation {} done in {} ticks: finished={}, crashed={}, timed_out={}, best={:.2}, mean={:.2}",
            stats.generation,
            stats.ticks,
            stats.finished,
            stats.crashed,
            stats.timed_out,
            stats.best_score,
            stats.mean_score
        );
        self.history.push(stats.clone());

        let scored = std::mem::take(&mut self.cars)
            .into_iter()
            .map(|car| (car.fitness(), car.brain))
            .collect();
        self.survivors = self.breeder.select_survivors(scored);
        log::debug!("Kept {} survivor brains", self.survivors.len());

        self.generation += 1;
        self.generation_ticks = 0;
        self.populate();
        stats
    }
}

impl<T: TrackSurface> EpisodeLoop for EvolutionSimulation<T> {
    fn tick(&mut self) -> Result<TickReport, SimError> {
        self.ticks += 1;
        self.generation_ticks += 1;

        let track = &self.track;
        self.cars.par_iter_mut().for_each(|car| car.update(track));

        let alive = self.alive_count();
        let completed = (alive == 0).then(|| self.advance_generation());

        Ok(TickReport {
            tick: self.ticks,
            alive,
            loss: None,
            completed,
        })
    }

    fn generation(&self) -> u32 {
        self.generation
    }

    fn ticks(&self) -> u64 {
        self.ticks
    }

    fn frame(&self) -> RenderFrame {
        RenderFrame::capture(
            self.generation,
            self.generation_ticks,
            self.cars.iter().map(|c| &c.vehicle),
            &self.track,
        )
    }

    fn history(&self) -> &[GenerationStats] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_population() {
        let sim = EvolutionSimulation::new(TrackLayout::ring(), EvolutionSimConfig::default(), 1)
            .unwrap();
        assert_eq!(sim.cars().len(), 50);
        assert!(sim.survivors().is_empty());
        for car in sim.cars() {
            let offset = car.vehicle.position - Vec2::new(150.0, 150.0);
            assert!(offset.x.abs() <= 10.0 && offset.y.abs() <= 10.0);
            assert!(car.vehicle.heading.abs() <= 0.1);
            assert_eq!(car.brain.shape(), [(6, 5), (1, 6)]);
        }
    }

    #[test]
    fn test_generation_ends_within_budget() {
        let mut sim = EvolutionSimulation::new(TrackLayout::ring(), EvolutionSimConfig::default(), 2)
            .unwrap();

        let mut completed = None;
        for _ in 0..501 {
            if let Some(stats) = sim.tick().unwrap().completed {
                completed = Some(stats);
                break;
            }
        }

        let stats = completed.expect("every car stops by the step budget");
        assert_eq!(stats.generation, 1);
        assert_eq!(stats.population, 50);
        assert_eq!(sim.generation(), 2);
        assert_eq!(sim.survivors().len(), 10);
        assert_eq!(sim.cars().len(), 50);
        assert!(sim.cars().iter().all(|c| c.is_alive()));
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let mut sim =
                EvolutionSimulation::new(TrackLayout::ring(), EvolutionSimConfig::default(), seed)
                    .unwrap();
            for _ in 0..50 {
                sim.tick().unwrap();
            }
            sim.cars().iter().map(|c| c.fitness()).collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
