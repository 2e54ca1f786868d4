//! Error types for the orchestration layer

use crate::invoker::AgentError;
use customs_storage::StorageError;
use customs_types::{ActionKind, CustomsError, JobId};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    #[error(transparent)]
    Domain(#[from] CustomsError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The job was marked failed and persisted before this was returned.
    #[error("Agent invocation for {action} failed: {source}")]
    Agent {
        action: ActionKind,
        #[source]
        source: AgentError,
    },
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
