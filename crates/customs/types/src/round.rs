//! Rounds: the append-only audit trail of a job

use crate::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an executed round ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundOutcome {
    Success,
    NeedsInput { questions: Vec<String> },
    Error { message: String },
}

impl RoundOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// One executed action. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based position in the round log
    pub round_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub action: ActionKind,
    pub reason: String,
    #[serde(default)]
    pub self_healing: bool,
    /// Request payload sent to the agent, as recorded for audit
    #[serde(default)]
    pub input_params: Value,
    pub output_summary: String,
    pub outcome: RoundOutcome,
    pub confidence_after: u8,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl Round {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, RoundOutcome::Success)
    }
}
