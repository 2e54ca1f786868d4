//! Escalation summary handed to a human reviewer

use crate::{ActionKind, RoundOutcome, ValidationIssue};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationSummary {
    pub reason: String,
    pub recent_rounds: Vec<RoundDigest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_guess: Option<BestGuess>,
    #[serde(default)]
    pub outstanding_issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub confidence_trajectory: Vec<u8>,
}

/// Condensed view of a round for reviewers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundDigest {
    pub round_number: u32,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub outcome: RoundOutcome,
    pub confidence_after: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BestGuess {
    pub hs_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    pub confidence: u8,
}
