//! Job identity and lifecycle status

use crate::{CustomsError, CustomsResult};
use serde::{Deserialize, Serialize};

/// Longest accepted job identifier
pub const MAX_JOB_ID_LEN: usize = 128;

// ── Job Identifier ───────────────────────────────────────────────────

/// Opaque identifier of a classification job
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Validate an externally supplied identifier.
    ///
    /// Accepts 1..=128 characters from `[A-Za-z0-9_.-]`.
    pub fn parse(raw: impl AsRef<str>) -> CustomsResult<Self> {
        let raw = raw.as_ref().trim();
        let invalid = |reason: &str| CustomsError::InvalidJobId {
            id: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if raw.len() > MAX_JOB_ID_LEN {
            return Err(invalid("longer than 128 characters"));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(invalid("only letters, digits, '_', '-' and '.' are allowed"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = CustomsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ── Job Status ───────────────────────────────────────────────────────

/// Lifecycle status of a classification job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Initializing,
    InProgress,
    WaitingForUser,
    Completed,
    Failed,
    Escalated,
}

impl JobStatus {
    /// Completed, failed and escalated jobs are never mutated again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Escalated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::InProgress => "in_progress",
            Self::WaitingForUser => "waiting_for_user",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Escalated => "escalated",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_accepts_safe_characters() {
        let id = JobId::parse("job_2024.07-a1").unwrap();
        assert_eq!(id.as_str(), "job_2024.07-a1");
        assert_eq!(id.short(), "job_2024");
    }

    #[test]
    fn test_job_id_trims_whitespace() {
        assert_eq!(JobId::parse("  abc  ").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_job_id_rejects_bad_input() {
        assert!(JobId::parse("").is_err());
        assert!(JobId::parse("   ").is_err());
        assert!(JobId::parse("a/b").is_err());
        assert!(JobId::parse("x".repeat(MAX_JOB_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_generated_ids_are_valid() {
        let id = JobId::generate();
        assert!(JobId::parse(id.as_str()).is_ok());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Escalated.is_terminal());
        assert!(!JobStatus::WaitingForUser.is_terminal());
        assert!(!JobStatus::InProgress.is_terminal());
        assert!(!JobStatus::Initializing.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::WaitingForUser).unwrap();
        assert_eq!(json, "\"waiting_for_user\"");
    }
}
