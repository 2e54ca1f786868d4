//! Error types for the customs domain layer

use crate::{JobId, JobStatus};

/// Errors raised when a reducer would break a state invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomsError {
    #[error("Invalid job id '{id}': {reason}")]
    InvalidJobId { id: String, reason: String },

    #[error("Job {job_id} is terminal ({status}); no further changes allowed")]
    TerminalState { job_id: JobId, status: JobStatus },

    #[error("Round out of order: expected {expected}, got {got}")]
    RoundOutOfOrder { expected: u32, got: u32 },

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Result type for customs domain operations
pub type CustomsResult<T> = Result<T, CustomsError>;
