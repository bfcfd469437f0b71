//! Synchronous value-based simulation
//!
//! Vehicles query an in-process agent every tick. Training runs on a fixed
//! tick cadence independent of generation boundaries.

use glam::Vec2;
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use trackrunner_brain::{DqnAgent, DqnConfig, seeded};
use trackrunner_track::{TrackLayout, TrackSurface};

use crate::SimError;
use crate::episode::{EpisodeLoop, TickReport};
use crate::frame::RenderFrame;
use crate::learner::LearnerCar;
use crate::reward::RewardConfig;
use crate::stats::GenerationStats;
use crate::vehicle::VehicleConfig;

/// How agents are assigned to vehicles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentSharing {
    /// One fresh agent per vehicle, recreated every generation
    PerVehicle,
    /// One agent and replay buffer for the whole population, kept across
    /// generations
    #[default]
    Shared,
}

/// Population and training cadence of the value-based variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnSimConfig {
    pub population: usize,
    /// Position of the first vehicle
    pub spawn: Vec2,
    /// Vertical gap between consecutive vehicles
    pub spawn_spacing: f32,
    pub spawn_heading: f32,
    /// Ticks between training steps
    pub train_interval: u64,
    pub sharing: AgentSharing,
    /// Per-vehicle step budget
    pub max_steps: Option<u32>,
    pub vehicle: VehicleConfig,
    pub reward: RewardConfig,
    pub agent: DqnConfig,
}

impl Default for DqnSimConfig {
    fn default() -> Self {
        Self {
            population: 10,
            spawn: Vec2::new(150.0, 150.0),
            spawn_spacing: 10.0,
            spawn_heading: 0.0,
            train_interval: 5,
            sharing: AgentSharing::Shared,
            max_steps: None,
            vehicle: VehicleConfig::learner(),
            reward: RewardConfig::default(),
            agent: DqnConfig::default(),
        }
    }
}

impl DqnSimConfig {
    /// Spawn point of vehicle `index`
    pub fn spawn_point(&self, index: usize) -> Vec2 {
        self.spawn + Vec2::new(0.0, index as f32 * self.spawn_spacing)
    }

    /// Spawn a fresh population of learner cars
    pub(crate) fn spawn_cars<T: TrackSurface + ?Sized>(&self, track: &T) -> Vec<LearnerCar> {
        (0..self.population)
            .map(|i| {
                LearnerCar::new(
                    track,
                    self.spawn_point(i),
                    self.spawn_heading,
                    self.vehicle.clone(),
                    self.reward.clone(),
                    self.max_steps,
                )
            })
            .collect()
    }

    /// Agent config with the state width tied to the sensor count
    pub(crate) fn agent_config(&self) -> DqnConfig {
        DqnConfig {
            state_size: self.vehicle.sensor_count(),
            ..self.agent.clone()
        }
    }
}

/// Agents owned by a simulation
#[derive(Debug, Clone)]
struct AgentPool {
    sharing: AgentSharing,
    agents: Vec<DqnAgent>,
}

impl AgentPool {
    fn new(
        sharing: AgentSharing,
        population: usize,
        config: &DqnConfig,
        rng: &mut Xoshiro256StarStar,
    ) -> Self {
        let count = match sharing {
            AgentSharing::Shared => 1,
            AgentSharing::PerVehicle => population,
        };
        Self {
            sharing,
            agents: (0..count).map(|_| DqnAgent::new(config.clone(), rng)).collect(),
        }
    }

    fn for_vehicle(&mut self, index: usize) -> &mut DqnAgent {
        match self.sharing {
            AgentSharing::Shared => &mut self.agents[0],
            AgentSharing::PerVehicle => &mut self.agents[index],
        }
    }

    fn mean_epsilon(&self) -> Option<f32> {
        if self.agents.is_empty() {
            return None;
        }
        let total: f32 = self.agents.iter().map(DqnAgent::epsilon).sum();
        Some(total / self.agents.len() as f32)
    }
}

/// Value-based simulation with agents living on the simulation thread
pub struct DqnSimulation<T: TrackSurface = TrackLayout> {
    config: DqnSimConfig,
    track: T,
    cars: Vec<LearnerCar>,
    pool: AgentPool,
    rng: Xoshiro256StarStar,
    generation: u32,
    ticks: u64,
    generation_ticks: u64,
    history: Vec<GenerationStats>,
}

impl<T: TrackSurface> DqnSimulation<T> {
    pub fn new(track: T, config: DqnSimConfig, seed: u64) -> Result<Self, SimError> {
        track.check_invariants()?;

        let mut rng = seeded(seed);
        let pool = AgentPool::new(
            config.sharing,
            config.population,
            &config.agent_config(),
            &mut rng,
        );
        let cars = config.spawn_cars(&track);

        log::info!(
            "DQN simulation: {} vehicles, {:?} agents, train every {} ticks",
            config.population,
            config.sharing,
            config.train_interval
        );

        Ok(Self {
            config,
            track,
            cars,
            pool,
            rng,
            generation: 1,
            ticks: 0,
            generation_ticks: 0,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &DqnSimConfig {
        &self.config
    }

    pub fn track(&self) -> &T {
        &self.track
    }

    pub fn cars(&self) -> &[LearnerCar] {
        &self.cars
    }

    /// Agents in vehicle order (a single entry when shared)
    pub fn agents(&self) -> &[DqnAgent] {
        &self.pool.agents
    }

    pub fn alive_count(&self) -> usize {
        self.cars.iter().filter(|c| c.is_alive()).count()
    }

    fn train(&mut self) -> Option<f32> {
        let losses: Vec<f32> = self
            .pool
            .agents
            .iter_mut()
            .filter_map(|agent| agent.replay(&mut self.rng))
            .map(|outcome| outcome.loss)
            .collect();
        if losses.is_empty() {
            None
        } else {
            Some(losses.iter().sum::<f32>() / losses.len() as f32)
        }
    }

    fn advance_generation(&mut self) -> GenerationStats {
        let stats = GenerationStats::collect(
            self.generation,
            self.generation_ticks,
            self.cars
                .iter()
                .map(|c| (c.vehicle.termination, c.total_reward())),
            self.pool.mean_epsilon(),
        );
        log::info!(
            "Generation {} done in {} ticks: finished={}, crashed={}, best={:.2}, mean={:.2}",
            stats.generation,
            stats.ticks,
            stats.finished,
            stats.crashed,
            stats.best_score,
            stats.mean_score
        );
        self.history.push(stats.clone());

        self.generation += 1;
        self.generation_ticks = 0;
        self.cars = self.config.spawn_cars(&self.track);
        if self.config.sharing == AgentSharing::PerVehicle {
            self.pool = AgentPool::new(
                self.config.sharing,
                self.config.population,
                &self.config.agent_config(),
                &mut self.rng,
            );
        }
        stats
    }
}

impl<T: TrackSurface> EpisodeLoop for DqnSimulation<T> {
    fn tick(&mut self) -> Result<TickReport, SimError> {
        self.ticks += 1;
        self.generation_ticks += 1;

        for (index, car) in self.cars.iter_mut().enumerate() {
            let agent = self.pool.for_vehicle(index);
            car.update(&self.track, agent, &mut self.rng)?;
        }

        let loss = if self.config.train_interval > 0 && self.ticks % self.config.train_interval == 0 {
            self.train()
        } else {
            None
        };

        let alive = self.alive_count();
        let completed = (alive == 0).then(|| self.advance_generation());

        Ok(TickReport {
            tick: self.ticks,
            alive,
            loss,
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
    fn test_spawn_points() {
        let config = DqnSimConfig::default();
        assert_eq!(config.spawn_point(0), Vec2::new(150.0, 150.0));
        assert_eq!(config.spawn_point(9), Vec2::new(150.0, 240.0));
    }

    #[test]
    fn test_new_spawns_population() {
        let sim = DqnSimulation::new(TrackLayout::classic(), DqnSimConfig::default(), 1).unwrap();
        assert_eq!(sim.cars().len(), 10);
        assert_eq!(sim.agents().len(), 1);
        assert_eq!(sim.generation(), 1);
        assert_eq!(sim.alive_count(), 10);
        assert!(sim.cars().iter().all(|c| c.vehicle.is_on_track(sim.track())));
    }

    #[test]
    fn test_per_vehicle_agents() {
        let config = DqnSimConfig {
            sharing: AgentSharing::PerVehicle,
            ..DqnSimConfig::default()
        };
        let mut sim = DqnSimulation::new(TrackLayout::classic(), config, 2).unwrap();
        assert_eq!(sim.agents().len(), 10);

        sim.tick().unwrap();
        assert!(sim.agents().iter().all(|a| a.memory().len() == 1));
    }

    #[test]
    fn test_shared_agent_collects_all_experience() {
        let mut sim = DqnSimulation::new(TrackLayout::classic(), DqnSimConfig::default(), 3).unwrap();
        for _ in 0..3 {
            sim.tick().unwrap();
        }
        assert_eq!(sim.agents()[0].memory().len(), 30);
    }

    #[test]
    fn test_training_cadence() {
        let config = DqnSimConfig {
            train_interval: 5,
            ..DqnSimConfig::default()
        };
        let mut sim = DqnSimulation::new(TrackLayout::classic(), config, 4).unwrap();

        // 10 vehicles fill 40 entries by tick 4; the first replay is at tick 5
        for _ in 0..4 {
            assert_eq!(sim.tick().unwrap().loss, None);
        }
        let report = sim.tick().unwrap();
        assert!(report.loss.is_some());
        assert_eq!(sim.agents()[0].train_steps(), 1);
    }

    #[test]
    fn test_invalid_layout_is_rejected() {
        let mut layout = TrackLayout::classic();
        layout.obstacle =
            trackrunner_track::Rect::new(Vec2::new(50.0, 50.0), Vec2::new(200.0, 200.0));
        assert!(matches!(
            DqnSimulation::new(layout, DqnSimConfig::default(), 5),
            Err(SimError::Track(_))
        ));
    }
}
