//! State store: loading and checkpointing conversation state
//!
//! Wraps the storage contracts with the resume rules: a terminal checkpoint
//! is returned as-is, an abort flag wins over resumption, and an existing
//! non-terminal checkpoint is resumed instead of re-initialized.

use crate::error::{OrchestratorError, OrchestratorResult};
use customs_storage::{CustomsStorage, JobRecord};
use customs_types::{ConversationState, JobId, DEFAULT_MAX_ROUNDS};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// No checkpoint yet; a fresh state was created
    Fresh(ConversationState),
    /// In-progress or waiting checkpoint to continue
    Resume(ConversationState),
    /// Completed, failed or escalated; must not be touched
    Terminal(ConversationState),
    /// An operator asked the job to stop
    AbortRequested(ConversationState),
}

impl LoadOutcome {
    pub fn state(&self) -> &ConversationState {
        match self {
            Self::Fresh(s) | Self::Resume(s) | Self::Terminal(s) | Self::AbortRequested(s) => s,
        }
    }

    pub fn into_state(self) -> ConversationState {
        match self {
            Self::Fresh(s) | Self::Resume(s) | Self::Terminal(s) | Self::AbortRequested(s) => s,
        }
    }
}

#[derive(Clone)]
pub struct StateStore {
    storage: Arc<dyn CustomsStorage>,
    max_rounds: u32,
}

impl StateStore {
    pub fn new(storage: Arc<dyn CustomsStorage>) -> Self {
        Self {
            storage,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn storage(&self) -> &Arc<dyn CustomsStorage> {
        &self.storage
    }

    pub fn create_initial(&self, job_id: JobId) -> ConversationState {
        ConversationState::new(job_id).with_max_rounds(self.max_rounds)
    }

    pub async fn job(&self, job_id: &JobId) -> OrchestratorResult<JobRecord> {
        self.storage
            .get_job(job_id)
            .await?
            .ok_or_else(|| OrchestratorError::JobNotFound(job_id.clone()))
    }

    pub async fn load(&self, job_id: &JobId) -> OrchestratorResult<(JobRecord, LoadOutcome)> {
        let job = self.job(job_id).await?;
        let checkpoint = self.storage.load_checkpoint(job_id).await?;

        let outcome = match checkpoint {
            Some(state) if state.is_terminal() => LoadOutcome::Terminal(state),
            Some(state) if job.abort_requested => LoadOutcome::AbortRequested(state),
            Some(state) => LoadOutcome::Resume(state),
            None if job.abort_requested => {
                LoadOutcome::AbortRequested(self.create_initial(job_id.clone()))
            }
            None => LoadOutcome::Fresh(self.create_initial(job_id.clone())),
        };
        Ok((job, outcome))
    }

    pub async fn abort_requested(&self, job_id: &JobId) -> OrchestratorResult<bool> {
        Ok(self.job(job_id).await?.abort_requested)
    }

    pub async fn persist(&self, state: &ConversationState) -> OrchestratorResult<()> {
        self.storage.save_checkpoint(state).await?;
        tracing::debug!(
            job_id = %state.job_id,
            round = state.current_round,
            status = %state.status,
            "checkpoint saved"
        );
        Ok(())
    }
}
