//! Vehicle driven by an evolved steering network

use glam::Vec2;
use serde::{Deserialize, Serialize};
use trackrunner_brain::SteeringNetwork;
use trackrunner_track::TrackSurface;

use crate::vehicle::{Termination, Vehicle, VehicleConfig};

/// Fitness constants of the evolutionary variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessConfig {
    /// Multiplier on distance gained toward the finish
    pub progress_scale: f32,
    /// Fixed part of the finish bonus
    pub finish_bonus: f32,
    /// Bonus per tick left in the budget when finishing
    pub time_bonus: f32,
    /// Step budget
    pub max_time: u32,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            progress_scale: 10.0,
            finish_bonus: 500.0,
            time_bonus: 2.0,
            max_time: 500,
        }
    }
}

/// Vehicle, its brain and the fitness accumulated this generation
#[derive(Debug, Clone)]
pub struct EvolvedCar {
    pub vehicle: Vehicle,
    pub brain: SteeringNetwork,
    fitness: f32,
    time_alive: u32,
    last_distance: f32,
    config: FitnessConfig,
}

impl EvolvedCar {
    pub fn new<T: TrackSurface + ?Sized>(
        track: &T,
        position: Vec2,
        heading: f32,
        vehicle: VehicleConfig,
        brain: SteeringNetwork,
        config: FitnessConfig,
    ) -> Self {
        Self {
            vehicle: Vehicle::new(position, heading, vehicle),
            brain,
            fitness: 0.0,
            time_alive: 0,
            last_distance: track.distance_to_finish(position),
            config,
        }
    }

    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn time_alive(&self) -> u32 {
        self.time_alive
    }

    pub fn is_alive(&self) -> bool {
        self.vehicle.alive
    }

    /// Steering command in [-1, 1] for a network output in [0, 1]
    pub fn steering(output: f32) -> f32 {
        (output - 0.5) * 2.0
    }

    /// Sense, steer, move and score one tick. No-op once terminated.
    pub fn update<T: TrackSurface + ?Sized>(&mut self, track: &T) {
        if !self.vehicle.alive {
            return;
        }

        let readings = self.vehicle.sensor_inputs(track);
        let output = self.brain.predict(&readings).first().copied().unwrap_or(0.5);
        let rate = self.vehicle.config().steering_rate;
        self.vehicle.steer(Self::steering(output) * rate);
        self.vehicle.advance();

        let distance = track.distance_to_finish(self.vehicle.position);
        self.fitness += (self.last_distance - distance) * self.config.progress_scale;
        self.last_distance = distance;

        if self.vehicle.is_on_finish(track) {
            let remaining = self.config.max_time as f32 - self.time_alive as f32;
            self.fitness += self.config.finish_bonus + remaining * self.config.time_bonus;
            self.vehicle.terminate(Termination::Finished);
        } else if !self.vehicle.is_on_track(track) {
            self.vehicle.terminate(Termination::Crashed);
        }

        self.time_alive += 1;
        if self.time_alive > self.config.max_time {
            self.vehicle.terminate(Termination::TimedOut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackrunner_brain::{Breeder, seeded};
    use trackrunner_track::TrackLayout;

    fn car_at(track: &TrackLayout, position: Vec2, heading: f32) -> EvolvedCar {
        let mut rng = seeded(41);
        EvolvedCar::new(
            track,
            position,
            heading,
            VehicleConfig::evolved(),
            Breeder::default().random_brain(&mut rng),
            FitnessConfig::default(),
        )
    }

    #[test]
    fn test_steering_mapping() {
        assert_eq!(EvolvedCar::steering(0.5), 0.0);
        assert_eq!(EvolvedCar::steering(1.0), 1.0);
        assert_eq!(EvolvedCar::steering(0.0), -1.0);
    }

    #[test]
    fn test_progress_accumulates_fitness() {
        let track = TrackLayout::ring();
        let mut car = car_at(&track, Vec2::new(150.0, 150.0), 0.0);
        let before = track.distance_to_finish(car.vehicle.position);

        car.update(&track);
        let after = track.distance_to_finish(car.vehicle.position);

        assert!(car.is_alive());
        assert_eq!(car.time_alive(), 1);
        assert!((car.fitness() - (before - after) * 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_finish_bonus_scales_with_time() {
        let track = TrackLayout::ring();
        // Just outside the finish rectangle, heading into it
        let mut car = car_at(&track, Vec2::new(649.0, 475.0), 0.0);
        car.time_alive = 100;

        car.update(&track);
        assert_eq!(car.vehicle.termination, Some(Termination::Finished));
        // progress is at most 2 units * 10, bonus is 500 + 400 * 2
        assert!(car.fitness() > 1300.0 - 25.0);
        assert!(car.fitness() < 1300.0 + 25.0);
    }

    #[test]
    fn test_crash_terminates() {
        let track = TrackLayout::ring();
        let mut car = car_at(&track, Vec2::new(101.0, 150.0), std::f32::consts::PI);
        car.update(&track);
        assert_eq!(car.vehicle.termination, Some(Termination::Crashed));
        assert!(!car.is_alive());

        let position = car.vehicle.position;
        car.update(&track);
        assert_eq!(car.vehicle.position, position);
        assert_eq!(car.time_alive(), 1);
    }

    #[test]
    fn test_step_budget() {
        let track = TrackLayout::ring();
        let mut car = car_at(&track, Vec2::new(150.0, 150.0), 0.0);
        car.time_alive = 500;

        car.update(&track);
        assert!(!car.is_alive());
        assert_eq!(car.time_alive(), 501);
    }
}
