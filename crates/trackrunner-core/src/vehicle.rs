//! Vehicle kinematics and ray sensors
//!
//! A vehicle moves at constant speed along its heading. Sensors march a ray
//! in unit steps and report the first step that leaves the track.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use trackrunner_track::TrackSurface;

/// Fixed vehicle parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Distance advanced per tick
    pub speed: f32,
    /// Body size (render only)
    pub size: f32,
    /// Maximum sensor range in unit steps
    pub sensor_length: u32,
    /// Sensor angles relative to heading (radians)
    pub sensor_offsets: Vec<f32>,
    /// Heading change per discrete turn action
    pub turn_increment: f32,
    /// Heading change per unit of continuous steering
    pub steering_rate: f32,
}

impl VehicleConfig {
    /// Three sensors (left diagonal, ahead, right diagonal)
    pub fn learner() -> Self {
        Self {
            speed: 2.0,
            size: 20.0,
            sensor_length: 100,
            sensor_offsets: vec![-FRAC_PI_4, 0.0, FRAC_PI_4],
            turn_increment: 0.05,
            steering_rate: 0.05,
        }
    }

    /// Five sensors spread evenly over a quarter turn
    pub fn evolved() -> Self {
        Self {
            sensor_offsets: fan(5, FRAC_PI_2),
            ..Self::learner()
        }
    }

    pub fn sensor_count(&self) -> usize {
        self.sensor_offsets.len()
    }
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self::learner()
    }
}

/// `count` offsets spread evenly over `spread`, centered on the heading
pub fn fan(count: usize, spread: f32) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..count)
            .map(|i| -spread / 2.0 + (i as f32 / (count - 1) as f32) * spread)
            .collect(),
    }
}

/// Why a vehicle stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Termination {
    Finished,
    Crashed,
    /// Step budget exhausted
    TimedOut,
    /// Waited too long for a policy decision
    Stalled,
    /// Policy refused the request
    PolicyFailure,
}

/// Discrete steering command of the value-based policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SteeringAction {
    Left,
    Straight,
    Right,
}

impl SteeringAction {
    pub const COUNT: usize = 3;

    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SteeringAction::Left),
            1 => Some(SteeringAction::Straight),
            2 => Some(SteeringAction::Right),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        match self {
            SteeringAction::Left => 0,
            SteeringAction::Straight => 1,
            SteeringAction::Right => 2,
        }
    }

    /// Heading change for this action
    pub fn heading_delta(self, turn_increment: f32) -> f32 {
        match self {
            SteeringAction::Left => -turn_increment,
            SteeringAction::Straight => 0.0,
            SteeringAction::Right => turn_increment,
        }
    }
}

/// Result of one sensor ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorHit {
    /// Steps travelled before leaving the track, in [0, sensor_length]
    pub distance: u32,
    /// Ray end point (first off-track sample, or max range)
    pub end: Vec2,
}

/// Vehicle state shared by both policy variants
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub position: Vec2,
    /// Heading in radians
    pub heading: f32,
    pub alive: bool,
    /// Updates performed since spawn
    pub steps: u32,
    pub termination: Option<Termination>,
    config: VehicleConfig,
}

impl Vehicle {
    pub fn new(position: Vec2, heading: f32, config: VehicleConfig) -> Self {
        Self {
            position,
            heading,
            alive: true,
            steps: 0,
            termination: None,
            config,
        }
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    fn direction(&self, offset: f32) -> Vec2 {
        let angle = self.heading + offset;
        Vec2::new(angle.cos(), angle.sin())
    }

    /// March a ray at `heading + offset` in unit steps
    pub fn cast_sensor<T: TrackSurface + ?Sized>(&self, track: &T, offset: f32) -> SensorHit {
        let dir = self.direction(offset);
        for i in 0..self.config.sensor_length {
            let test = self.position + dir * i as f32;
            if !track.is_on_track(test.x, test.y) {
                return SensorHit {
                    distance: i,
                    end: test,
                };
            }
        }
        SensorHit {
            distance: self.config.sensor_length,
            end: self.position + dir * self.config.sensor_length as f32,
        }
    }

    /// Proximity per sensor: 0 = clear within range, 1 = touching
    pub fn sensor_inputs<T: TrackSurface + ?Sized>(&self, track: &T) -> Vec<f32> {
        let length = self.config.sensor_length.max(1) as f32;
        self.config
            .sensor_offsets
            .iter()
            .map(|&offset| 1.0 - self.cast_sensor(track, offset).distance as f32 / length)
            .collect()
    }

    /// Ray end points, for rendering
    pub fn sensor_endpoints<T: TrackSurface + ?Sized>(&self, track: &T) -> Vec<Vec2> {
        self.config
            .sensor_offsets
            .iter()
            .map(|&offset| self.cast_sensor(track, offset).end)
            .collect()
    }

    pub fn steer(&mut self, delta: f32) {
        self.heading += delta;
    }

    /// Move `speed` units along the current heading
    pub fn advance(&mut self) {
        self.position += self.direction(0.0) * self.config.speed;
        self.steps += 1;
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position.distance(point)
    }

    pub fn is_on_track<T: TrackSurface + ?Sized>(&self, track: &T) -> bool {
        track.is_on_track(self.position.x, self.position.y)
    }

    pub fn is_on_finish<T: TrackSurface + ?Sized>(&self, track: &T) -> bool {
        track.is_on_finish(self.position.x, self.position.y)
    }

    /// Clear the alive flag. The first reason recorded wins.
    pub fn terminate(&mut self, reason: Termination) {
        self.alive = false;
        if self.termination.is_none() {
            self.termination = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackrunner_track::TrackLayout;

    #[test]
    fn test_fan_offsets() {
        let offsets = fan(5, FRAC_PI_2);
        assert_eq!(offsets.len(), 5);
        assert!((offsets[0] + FRAC_PI_4).abs() < 1e-6);
        assert!(offsets[2].abs() < 1e-6);
        assert!((offsets[4] - FRAC_PI_4).abs() < 1e-6);
        assert_eq!(fan(1, 1.0), vec![0.0]);
        assert!(fan(0, 1.0).is_empty());
    }

    #[test]
    fn test_sensor_hits_wall_ahead() {
        let track = TrackLayout::classic();
        // 30 units from the right outer edge, facing it
        let vehicle = Vehicle::new(Vec2::new(670.0, 150.0), 0.0, VehicleConfig::learner());

        let hit = vehicle.cast_sensor(&track, 0.0);
        assert_eq!(hit.distance, 30);
        assert!((hit.end.x - 700.0).abs() < 1e-3);
    }

    #[test]
    fn test_sensor_clear_returns_max_range() {
        let track = TrackLayout::classic();
        let vehicle = Vehicle::new(Vec2::new(150.0, 150.0), 0.0, VehicleConfig::learner());

        let hit = vehicle.cast_sensor(&track, 0.0);
        assert_eq!(hit.distance, 100);
        assert!((hit.end - Vec2::new(250.0, 150.0)).length() < 1e-3);
    }

    #[test]
    fn test_sensor_off_track_origin_is_zero() {
        let track = TrackLayout::classic();
        let vehicle = Vehicle::new(Vec2::new(50.0, 50.0), 0.0, VehicleConfig::learner());

        assert_eq!(vehicle.cast_sensor(&track, 0.0).distance, 0);
        assert_eq!(vehicle.sensor_inputs(&track), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sensor_inputs_in_unit_range() {
        let track = TrackLayout::ring();
        let config = VehicleConfig::evolved();

        for &(x, y, heading) in &[
            (150.0, 150.0, 0.0),
            (105.0, 300.0, 3.0),
            (650.0, 450.0, 1.0),
            (400.0, 300.0, -2.0),
            (-1000.0, 0.0, 0.5),
        ] {
            let vehicle = Vehicle::new(Vec2::new(x, y), heading, config.clone());
            let inputs = vehicle.sensor_inputs(&track);
            assert_eq!(inputs.len(), 5);
            assert!(inputs.iter().all(|v| (0.0..=1.0).contains(v)));
            for &offset in &config.sensor_offsets {
                assert!(vehicle.cast_sensor(&track, offset).distance <= config.sensor_length);
            }
        }
    }

    #[test]
    fn test_advance_and_steer() {
        let mut vehicle = Vehicle::new(Vec2::new(0.0, 0.0), 0.0, VehicleConfig::learner());
        vehicle.advance();
        assert!((vehicle.position - Vec2::new(2.0, 0.0)).length() < 1e-6);

        vehicle.steer(std::f32::consts::FRAC_PI_2);
        vehicle.advance();
        assert!((vehicle.position - Vec2::new(2.0, 2.0)).length() < 1e-5);
        assert_eq!(vehicle.steps, 2);
    }

    #[test]
    fn test_terminate_keeps_first_reason() {
        let mut vehicle = Vehicle::new(Vec2::ZERO, 0.0, VehicleConfig::learner());
        vehicle.terminate(Termination::Finished);
        vehicle.terminate(Termination::TimedOut);
        assert!(!vehicle.alive);
        assert_eq!(vehicle.termination, Some(Termination::Finished));
    }

    #[test]
    fn test_steering_action_mapping() {
        for i in 0..SteeringAction::COUNT {
            assert_eq!(SteeringAction::from_index(i).unwrap().index(), i);
        }
        assert_eq!(SteeringAction::from_index(3), None);
        assert_eq!(SteeringAction::Left.heading_delta(0.05), -0.05);
        assert_eq!(SteeringAction::Straight.heading_delta(0.05), 0.0);
    }
}
