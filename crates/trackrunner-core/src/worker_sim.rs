//! Value-based simulation with the agent on a background worker
//!
//! Each alive vehicle without an outstanding request observes its state and
//! sends an act request. Responses are routed back by request id; a vehicle
//! whose response has not arrived keeps its last state. Vehicles left
//! waiting too long are terminated as stalled so the generation can end.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use trackrunner_brain::{DqnAgent, seeded};
use trackrunner_track::{TrackLayout, TrackSurface};

use crate::SimError;
use crate::dqn_sim::DqnSimConfig;
use crate::episode::{EpisodeLoop, TickReport};
use crate::frame::RenderFrame;
use crate::learner::LearnerCar;
use crate::stats::GenerationStats;
use crate::vehicle::{SteeringAction, Termination};
use crate::worker::{PolicyWorker, WorkerRequest, WorkerResponse};

/// Worker variant settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSimConfig {
    /// Population, cadence and agent settings; the agent is always shared
    pub sim: DqnSimConfig,
    /// Longest wait for action responses within one tick
    pub response_timeout_ms: u64,
    /// Ticks a vehicle may wait for an action; waiting longer stalls it out
    pub stall_limit_ticks: u64,
}

impl Default for WorkerSimConfig {
    fn default() -> Self {
        Self {
            sim: DqnSimConfig::default(),
            response_timeout_ms: 250,
            stall_limit_ticks: 600,
        }
    }
}

/// Outstanding act request
#[derive(Debug, Clone)]
struct PendingAction {
    vehicle: usize,
    state: Vec<f32>,
    issued_tick: u64,
}

/// Simulation whose policy runs on a `PolicyWorker`
pub struct WorkerSimulation<T: TrackSurface = TrackLayout> {
    config: WorkerSimConfig,
    track: T,
    cars: Vec<LearnerCar>,
    worker: PolicyWorker,
    pending: HashMap<u64, PendingAction>,
    waiting: Vec<bool>,
    next_request_id: u64,
    /// Exploration rate reported with the latest action
    epsilon: Option<f32>,
    generation: u32,
    ticks: u64,
    generation_ticks: u64,
    history: Vec<GenerationStats>,
}

impl<T: TrackSurface> WorkerSimulation<T> {
    pub fn new(track: T, config: WorkerSimConfig, seed: u64) -> Result<Self, SimError> {
        track.check_invariants()?;

        let mut rng = seeded(seed);
        let agent = DqnAgent::new(config.sim.agent_config(), &mut rng);
        let worker = PolicyWorker::spawn(agent, seed.wrapping_add(1))?;
        let cars = config.sim.spawn_cars(&track);

        log::info!(
            "Worker simulation: {} vehicles, train every {} ticks, response timeout {} ms",
            config.sim.population,
            config.sim.train_interval,
            config.response_timeout_ms
        );

        Ok(Self {
            waiting: vec![false; cars.len()],
            config,
            track,
            cars,
            worker,
            pending: HashMap::new(),
            next_request_id: 0,
            epsilon: None,
            generation: 1,
            ticks: 0,
            generation_ticks: 0,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &WorkerSimConfig {
        &self.config
    }

    pub fn cars(&self) -> &[LearnerCar] {
        &self.cars
    }

    pub fn alive_count(&self) -> usize {
        self.cars.iter().filter(|c| c.is_alive()).count()
    }

    /// Number of act requests still unanswered
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// Stop the worker and take the trained agent back
    pub fn shutdown(self) -> Result<DqnAgent, SimError> {
        self.worker.shutdown()
    }

    fn request_actions(&mut self) -> Result<(), SimError> {
        for (index, car) in self.cars.iter().enumerate() {
            if !car.is_alive() || self.waiting[index] {
                continue;
            }
            let state = car.observe(&self.track);
            let request_id = self.next_request_id;
            self.next_request_id += 1;

            self.worker.send(WorkerRequest::Act {
                request_id,
                state: state.clone(),
            })?;
            self.pending.insert(
                request_id,
                PendingAction {
                    vehicle: index,
                    state,
                    issued_tick: self.ticks,
                },
            );
            self.waiting[index] = true;
        }
        Ok(())
    }

    /// Wait for responses until none are pending or the timeout elapses
    fn collect_responses(&mut self) -> Result<(), SimError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.response_timeout_ms);
        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let response = if remaining.is_zero() {
                self.worker.try_recv()?
            } else {
                self.worker.recv_timeout(remaining)?
            };
            match response {
                Some(response) => self.handle_response(response)?,
                None => break,
            }
        }
        Ok(())
    }

    fn handle_response(&mut self, response: WorkerResponse) -> Result<(), SimError> {
        let Some(pending) = self.pending.remove(&response.request_id()) else {
            log::debug!("Discarding response to unknown request {}", response.request_id());
            return Ok(());
        };
        self.waiting[pending.vehicle] = false;
        let car = &mut self.cars[pending.vehicle];
        if !car.is_alive() {
            return Ok(());
        }

        match response {
            WorkerResponse::Action {
                action, epsilon, ..
            } => match SteeringAction::from_index(action) {
                Some(action) => {
                    self.epsilon = epsilon.or(self.epsilon);
                    let experience = car.apply_action(&self.track, pending.state, action);
                    self.worker
                        .send(WorkerRequest::Experience { data: experience })?;
                }
                None => {
                    log::warn!(
                        "Vehicle {} got out-of-range action {}",
                        pending.vehicle,
                        action
                    );
                    car.vehicle.terminate(Termination::PolicyFailure);
                }
            },
            WorkerResponse::Rejected { reason, .. } => {
                log::warn!("Vehicle {} request rejected: {}", pending.vehicle, reason);
                car.vehicle.terminate(Termination::PolicyFailure);
            }
        }
        Ok(())
    }

    /// Terminate vehicles that waited longer than the stall limit
    fn expire_stalled(&mut self) {
        let limit = self.config.stall_limit_ticks;
        let ticks = self.ticks;
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| ticks.saturating_sub(p.issued_tick) > limit)
            .map(|(&id, _)| id)
            .collect();

        for id in expired {
            if let Some(pending) = self.pending.remove(&id) {
                log::warn!(
                    "Vehicle {} stalled waiting {} ticks for request {}",
                    pending.vehicle,
                    ticks - pending.issued_tick,
                    id
                );
                self.waiting[pending.vehicle] = false;
                self.cars[pending.vehicle]
                    .vehicle
                    .terminate(Termination::Stalled);
            }
        }
    }

    fn advance_generation(&mut self) -> GenerationStats {
        let stats = GenerationStats::collect(
            self.generation,
            self.generation_ticks,
            self.cars
                .iter()
                .map(|c| (c.vehicle.termination, c.total_reward())),
            self.epsilon,
        );
        log::info!(
            "Generation {} done in {} ticks: finished={}, crashed={}, stalled={}, best={:.2}, mean={:.2}",
            stats.generation,
            stats.ticks,
            stats.finished,
            stats.crashed,
            stats.stalled,
            stats.best_score,
            stats.mean_score
        );
        self.history.push(stats.clone());

        self.generation += 1;
        self.generation_ticks = 0;
        self.pending.clear();
        self.cars = self.config.sim.spawn_cars(&self.track);
        self.waiting = vec![false; self.cars.len()];
        stats
    }
}

impl<T: TrackSurface> EpisodeLoop for WorkerSimulation<T> {
    fn tick(&mut self) -> Result<TickReport, SimError> {
        self.ticks += 1;
        self.generation_ticks += 1;

        self.request_actions()?;
        self.collect_responses()?;
        self.expire_stalled();

        let interval = self.config.sim.train_interval;
        if interval > 0 && self.ticks % interval == 0 {
            self.worker.send(WorkerRequest::Train)?;
        }

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
