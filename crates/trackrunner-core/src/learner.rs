//! Vehicle driven by the value-based agent
//!
//! One update is split in two halves so the worker variant can sit between
//! them: `observe` reads the pre-move state, `apply_action` performs the move
//! and produces the experience tuple.

use glam::Vec2;
use trackrunner_brain::{BrainError, BrainRng, DqnAgent, Experience};
use trackrunner_track::TrackSurface;

use crate::reward::{RewardConfig, RewardInputs, RewardShaper};
use crate::vehicle::{SteeringAction, Termination, Vehicle, VehicleConfig};

/// Vehicle plus per-vehicle reward state
#[derive(Debug, Clone)]
pub struct LearnerCar {
    pub vehicle: Vehicle,
    shaper: RewardShaper,
    /// Step budget; `None` means no limit
    max_steps: Option<u32>,
    total_reward: f32,
    last_reward: f32,
}

impl LearnerCar {
    pub fn new<T: TrackSurface + ?Sized>(
        track: &T,
        position: Vec2,
        heading: f32,
        vehicle: VehicleConfig,
        reward: RewardConfig,
        max_steps: Option<u32>,
    ) -> Self {
        let vehicle = Vehicle::new(position, heading, vehicle);
        let shaper = RewardShaper::new(reward, track.distance_to_finish(position));
        Self {
            vehicle,
            shaper,
            max_steps,
            total_reward: 0.0,
            last_reward: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.vehicle.alive
    }

    /// Sum of rewards since spawn
    pub fn total_reward(&self) -> f32 {
        self.total_reward
    }

    pub fn last_reward(&self) -> f32 {
        self.last_reward
    }

    pub fn shaper(&self) -> &RewardShaper {
        &self.shaper
    }

    /// Current sensor state
    pub fn observe<T: TrackSurface + ?Sized>(&self, track: &T) -> Vec<f32> {
        self.vehicle.sensor_inputs(track)
    }

    /// Steer, move, score the move and check terminal conditions
    ///
    /// `state` is the observation the action was chosen from.
    pub fn apply_action<T: TrackSurface + ?Sized>(
        &mut self,
        track: &T,
        state: Vec<f32>,
        action: SteeringAction,
    ) -> Experience {
        let heading_change = action.heading_delta(self.vehicle.config().turn_increment);
        self.vehicle.steer(heading_change);
        self.vehicle.advance();

        let next_state = self.vehicle.sensor_inputs(track);
        let position = self.vehicle.position;
        let on_track = self.vehicle.is_on_track(track);
        let on_finish = self.vehicle.is_on_finish(track);

        let reward = self.shaper.evaluate(&RewardInputs {
            position,
            distance_to_finish: track.distance_to_finish(position),
            on_finish,
            on_track,
            sensors: &next_state,
            heading_change,
        });
        self.total_reward += reward;
        self.last_reward = reward;

        let out_of_steps = self
            .max_steps
            .is_some_and(|limit| self.vehicle.steps >= limit);

        if on_finish {
            self.vehicle.terminate(Termination::Finished);
        } else if !on_track {
            self.vehicle.terminate(Termination::Crashed);
        } else if out_of_steps {
            self.vehicle.terminate(Termination::TimedOut);
        }

        Experience {
            state,
            action: action.index(),
            reward,
            next_state,
            done: !self.vehicle.alive,
        }
    }

    /// Full synchronous update against an in-process agent
    ///
    /// Returns the reward earned, or `None` if the vehicle was already
    /// terminated.
    pub fn update<T, R>(
        &mut self,
        track: &T,
        agent: &mut DqnAgent,
        rng: &mut R,
    ) -> Result<Option<f32>, BrainError>
    where
        T: TrackSurface + ?Sized,
        R: BrainRng + ?Sized,
    {
        if !self.vehicle.alive {
            return Ok(None);
        }

        let state = self.observe(track);
        let index = agent.act(&state, rng)?;
        let action = SteeringAction::from_index(index).ok_or(BrainError::ActionOutOfRange {
            action: index,
            action_size: SteeringAction::COUNT,
        })?;

        let experience = self.apply_action(track, state, action);
        let reward = experience.reward;
        agent.remember(experience)?;
        Ok(Some(reward))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackrunner_brain::{DqnConfig, seeded};
    use trackrunner_track::TrackLayout;

    fn car_at(track: &TrackLayout, position: Vec2, heading: f32) -> LearnerCar {
        LearnerCar::new(
            track,
            position,
            heading,
            VehicleConfig::learner(),
            RewardConfig::default(),
            None,
        )
    }

    #[test]
    fn test_apply_action_on_open_track() {
        let track = TrackLayout::classic();
        let mut car = car_at(&track, Vec2::new(150.0, 150.0), 0.0);

        let state = car.observe(&track);
        let experience = car.apply_action(&track, state.clone(), SteeringAction::Straight);

        assert!(car.is_alive());
        assert!(!experience.done);
        assert_eq!(experience.state, state);
        assert_eq!(experience.action, 1);
        assert_eq!(experience.next_state.len(), 3);
        assert_eq!(car.vehicle.steps, 1);
        assert_eq!(car.total_reward(), experience.reward);
    }

    #[test]
    fn test_driving_off_track_is_terminal() {
        let track = TrackLayout::classic();
        // One step from the left outer edge, facing it
        let mut car = car_at(&track, Vec2::new(101.0, 300.0), std::f32::consts::PI);

        let state = car.observe(&track);
        let experience = car.apply_action(&track, state, SteeringAction::Straight);

        assert!(experience.done);
        assert!(experience.reward <= -100.0);
        assert!(!car.is_alive());
        assert_eq!(car.vehicle.termination, Some(Termination::Crashed));
    }

    #[test]
    fn test_step_budget() {
        let track = TrackLayout::classic();
        let mut car = LearnerCar::new(
            &track,
            Vec2::new(150.0, 150.0),
            0.0,
            VehicleConfig::learner(),
            RewardConfig::default(),
            Some(3),
        );

        for _ in 0..3 {
            let state = car.observe(&track);
            car.apply_action(&track, state, SteeringAction::Straight);
        }
        assert!(!car.is_alive());
        assert_eq!(car.vehicle.termination, Some(Termination::TimedOut));
    }

    #[test]
    fn test_update_stores_experience() {
        let track = TrackLayout::classic();
        let mut rng = seeded(31);
        let mut agent = DqnAgent::new(DqnConfig::default(), &mut rng);
        let mut car = car_at(&track, Vec2::new(150.0, 150.0), 0.0);

        let reward = car.update(&track, &mut agent, &mut rng).unwrap();
        assert!(reward.is_some());
        assert_eq!(agent.memory().len(), 1);
    }

    #[test]
    fn test_update_is_noop_when_terminated() {
        let track = TrackLayout::classic();
        let mut rng = seeded(32);
        let mut agent = DqnAgent::new(DqnConfig::default(), &mut rng);
        let mut car = car_at(&track, Vec2::new(150.0, 150.0), 0.0);
        car.vehicle.terminate(Termination::Crashed);

        let position = car.vehicle.position;
        assert_eq!(car.update(&track, &mut agent, &mut rng).unwrap(), None);
        assert_eq!(car.vehicle.position, position);
        assert!(agent.memory().is_empty());
    }
}
