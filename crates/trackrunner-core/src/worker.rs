//! Background policy worker
//!
//! The agent lives on its own thread and is only reached through a message
//! envelope. Action requests carry a caller-chosen id that the response
//! echoes back; experience and train messages are fire-and-forget.
//!
//! Envelope (JSON form):
//! - `{"type": "act", "requestId": 7, "state": [..]}` → `{"type": "action", "requestId": 7, "action": 2, "epsilon": 0.9}`
//! - `{"type": "experience", "data": {..}}`
//! - `{"type": "train"}`
//! - `{"type": "shutdown"}`

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use trackrunner_brain::{DqnAgent, Experience, seeded};

use crate::SimError;

/// Message sent to the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkerRequest {
    /// Choose an action for `state`
    Act { request_id: u64, state: Vec<f32> },
    /// Store a transition
    Experience { data: Experience },
    /// Run one training step
    Train,
    /// Stop the worker and hand the agent back
    Shutdown,
}

/// Message sent back by the worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkerResponse {
    Action {
        request_id: u64,
        action: usize,
        /// Exploration rate the action was chosen with
        #[serde(default, skip_serializing_if = "Option::is_none")]
        epsilon: Option<f32>,
    },
    /// The act request could not be answered (e.g. wrong state width)
    Rejected { request_id: u64, reason: String },
}

impl WorkerResponse {
    pub fn request_id(&self) -> u64 {
        match self {
            WorkerResponse::Action { request_id, .. } | WorkerResponse::Rejected { request_id, .. } => {
                *request_id
            }
        }
    }
}

/// Handle to the worker thread
pub struct PolicyWorker {
    requests: Sender<WorkerRequest>,
    responses: Receiver<WorkerResponse>,
    handle: Option<JoinHandle<DqnAgent>>,
}

impl PolicyWorker {
    /// Move `agent` onto a new thread. `seed` drives its exploration and
    /// minibatch sampling.
    pub fn spawn(agent: DqnAgent, seed: u64) -> Result<Self, SimError> {
        let (request_tx, request_rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();
        let rng = seeded(seed);

        let handle = thread::Builder::new()
            .name("policy-worker".to_string())
            .spawn(move || serve(agent, rng, request_rx, response_tx))?;

        log::debug!("Policy worker started");
        Ok(Self {
            requests: request_tx,
            responses: response_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, request: WorkerRequest) -> Result<(), SimError> {
        self.requests
            .send(request)
            .map_err(|_| SimError::WorkerDisconnected)
    }

    /// Wait up to `timeout` for the next response. `Ok(None)` on timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerResponse>, SimError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SimError::WorkerDisconnected),
        }
    }

    /// Next response if one is already queued
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>, SimError> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SimError::WorkerDisconnected),
        }
    }

    /// Stop the thread and take the agent back
    pub fn shutdown(mut self) -> Result<DqnAgent, SimError> {
        let _ = self.requests.send(WorkerRequest::Shutdown);
        let handle = self.handle.take().ok_or(SimError::WorkerDisconnected)?;
        handle.join().map_err(|_| SimError::WorkerDisconnected)
    }
}

impl Drop for PolicyWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.requests.send(WorkerRequest::Shutdown);
            let _ = handle.join();
        }
    }
}

/// Worker loop: runs until shutdown or until the caller hangs up
fn serve(
    mut agent: DqnAgent,
    mut rng: Xoshiro256StarStar,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) -> DqnAgent {
    while let Ok(request) = requests.recv() {
        match request {
            WorkerRequest::Act { request_id, state } => {
                let response = match agent.act(&state, &mut rng) {
                    Ok(action) => WorkerResponse::Action {
                        request_id,
                        action,
                        epsilon: Some(agent.epsilon()),
                    },
                    Err(e) => {
                        log::warn!("Rejecting act request {}: {}", request_id, e);
                        WorkerResponse::Rejected {
                            request_id,
                            reason: e.to_string(),
                        }
                    }
                };
                if responses.send(response).is_err() {
                    break;
                }
            }
            WorkerRequest::Experience { data } => {
                if let Err(e) = agent.remember(data) {
                    log::warn!("Dropping malformed experience: {}", e);
                }
            }
            WorkerRequest::Train => {
                agent.replay(&mut rng);
            }
            WorkerRequest::Shutdown => break,
        }
    }
    log::debug!(
        "Policy worker stopping after {} training steps",
        agent.train_steps()
    );
    agent
}
