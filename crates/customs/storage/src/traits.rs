use crate::model::JobRecord;
use crate::StorageResult;
use async_trait::async_trait;
use customs_types::{ConversationState, JobId};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Registry of classification jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Register a job. Fails with `Conflict` if the id is taken.
    async fn create_job(&self, job: JobRecord) -> StorageResult<()>;

    async fn get_job(&self, job_id: &JobId) -> StorageResult<Option<JobRecord>>;

    /// Flag a job so the control loop stops at its next iteration.
    async fn request_abort(&self, job_id: &JobId) -> StorageResult<()>;

    /// List jobs newest-first.
    async fn list_jobs(&self, window: QueryWindow) -> StorageResult<Vec<JobRecord>>;
}

/// Durable checkpoints of conversation state, one document per job.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Upsert the checkpoint. A terminal checkpoint is never overwritten.
    async fn save_checkpoint(&self, state: &ConversationState) -> StorageResult<()>;

    async fn load_checkpoint(&self, job_id: &JobId) -> StorageResult<Option<ConversationState>>;
}

/// Combined storage contract used by the orchestrator and the service.
pub trait CustomsStorage: JobStore + CheckpointStore + Send + Sync {}

impl<T> CustomsStorage for T where T: JobStore + CheckpointStore + Send + Sync {}
