//! Error types for customs-service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use customs_engine::OrchestratorError;
use customs_storage::StorageError;
use customs_types::CustomsError;
use serde::Serialize;
use thiserror::Error;

/// Bootstrap and lifecycle errors
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Agent client error: {0}")]
    Agents(#[from] customs_agents::AgentsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// An agent call failed; the job has been marked failed.
    #[error("Agent failure: {0}")]
    Agent(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Agent(_) => (StatusCode::BAD_GATEWAY, "AGENT_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ApiError::NotFound(msg),
            StorageError::Conflict(msg) => ApiError::Conflict(msg),
            StorageError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CustomsError> for ApiError {
    fn from(err: CustomsError) -> Self {
        match err {
            CustomsError::InvalidJobId { .. } => ApiError::BadRequest(err.to_string()),
            CustomsError::TerminalState { .. } => ApiError::Conflict(err.to_string()),
            CustomsError::InvalidTransition(_) => ApiError::BadRequest(err.to_string()),
            CustomsError::RoundOutOfOrder { .. } => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::JobNotFound(id) => ApiError::NotFound(format!("job {id}")),
            OrchestratorError::Domain(e) => e.into(),
            OrchestratorError::Storage(e) => e.into(),
            err @ OrchestratorError::Agent { .. } => ApiError::Agent(err.to_string()),
        }
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use customs_engine::AgentError;
    use customs_types::{ActionKind, JobId, JobStatus};

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Agent("x".into()).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_orchestrator_error_mapping() {
        let id = JobId::parse("job-1").unwrap();
        assert!(matches!(
            ApiError::from(OrchestratorError::JobNotFound(id.clone())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(OrchestratorError::Domain(CustomsError::TerminalState {
                job_id: id,
                status: JobStatus::Completed,
            })),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(OrchestratorError::Storage(StorageError::Backend("down".into()))),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            ApiError::from(OrchestratorError::Agent {
                action: ActionKind::Classify,
                source: AgentError::Transport("refused".into()),
            }),
            ApiError::Agent(_)
        ));
    }
}
