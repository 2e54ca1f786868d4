//! Application state for API handlers

use customs_engine::ConversationOrchestrator;
use customs_types::JobId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConversationOrchestrator>,

    /// Jobs with a run or answer in progress
    in_flight: Arc<Mutex<HashSet<JobId>>>,

    /// Service version
    pub version: String,

    /// Service start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ConversationOrchestrator>) -> Self {
        Self {
            orchestrator,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Claim a job for exclusive work. Returns `None` if it is already
    /// claimed; the claim is released when the guard drops.
    pub fn claim(&self, job_id: &JobId) -> Option<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(job_id.clone()) {
            return None;
        }
        Some(InFlightGuard {
            job_id: job_id.clone(),
            in_flight: self.in_flight.clone(),
        })
    }

    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

pub struct InFlightGuard {
    job_id: JobId,
    in_flight: Arc<Mutex<HashSet<JobId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.job_id);
    }
}
