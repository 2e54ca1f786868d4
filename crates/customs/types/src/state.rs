//! Conversation state: the persisted record of one classification job
//!
//! Every reducer consumes the state and returns the next one. Reducers that
//! change facts or rounds refuse to run on a terminal state; the
//! termination reducers are idempotent and leave a terminal state untouched.

use crate::{
    Action, CustomsError, CustomsResult, EscalationSummary, FactKey, Facts, JobId, JobStatus,
    Round, ValidationResult,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default hard bound on executed rounds
pub const DEFAULT_MAX_ROUNDS: u32 = 12;

/// An answer the user gave to a clarification question
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAnswer {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
    pub answer: String,
    pub answered_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub job_id: JobId,
    /// Number of executed rounds; always equals `rounds.len()`
    pub current_round: u32,
    pub max_rounds: u32,
    pub rounds: Vec<Round>,
    pub current_state: Facts,
    /// Derived from `current_state` on every iteration
    pub overall_confidence: u8,
    /// Confidence after each round, parallel to `rounds`
    pub confidence_trajectory: Vec<u8>,
    pub status: JobStatus,
    pub self_healing_attempts: u32,
    /// The failed validation that triggered the latest self-healing attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failed_validation: Option<ValidationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination_reason: Option<String>,
    #[serde(default)]
    pub pending_questions: Vec<String>,
    #[serde(default)]
    pub user_answers: Vec<UserAnswer>,
    /// Residual caveats reported on completion
    #[serde(default)]
    pub caveats: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation: Option<EscalationSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(job_id: JobId) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            current_round: 0,
            max_rounds: DEFAULT_MAX_ROUNDS,
            rounds: Vec::new(),
            current_state: Facts::default(),
            overall_confidence: 0,
            confidence_trajectory: Vec::new(),
            status: JobStatus::Initializing,
            self_healing_attempts: 0,
            last_failed_validation: None,
            termination_reason: None,
            pending_questions: Vec::new(),
            user_answers: Vec::new(),
            caveats: Vec::new(),
            escalation: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn next_round_number(&self) -> u32 {
        self.current_round + 1
    }

    fn ensure_active(&self) -> CustomsResult<()> {
        if self.is_terminal() {
            return Err(CustomsError::TerminalState {
                job_id: self.job_id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    fn touch(mut self) -> Self {
        self.updated_at = Utc::now();
        self
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Enter (or re-enter) the control loop.
    pub fn start(mut self) -> CustomsResult<Self> {
        self.ensure_active()?;
        self.status = JobStatus::InProgress;
        Ok(self.touch())
    }

    /// Suspend until the user answers `questions`.
    pub fn await_user(mut self, questions: Vec<String>) -> CustomsResult<Self> {
        self.ensure_active()?;
        self.status = JobStatus::WaitingForUser;
        self.pending_questions = questions;
        Ok(self.touch())
    }

    /// Record a clarification answer.
    ///
    /// Product facts are cleared so the next run re-analyses the product
    /// with the answer in context.
    pub fn record_user_answer(mut self, answer: impl Into<String>) -> CustomsResult<Self> {
        self.ensure_active()?;
        if self.status != JobStatus::WaitingForUser {
            return Err(CustomsError::InvalidTransition(format!(
                "job is {}, not waiting for an answer",
                self.status
            )));
        }
        let answer = answer.into();
        if answer.trim().is_empty() {
            return Err(CustomsError::InvalidTransition(
                "answer must not be empty".into(),
            ));
        }
        self.user_answers.push(UserAnswer {
            questions: std::mem::take(&mut self.pending_questions),
            answer,
            answered_at: Utc::now(),
        });
        self.current_state = self
            .current_state
            .clear(&[FactKey::ProductProfile, FactKey::ProductReadiness]);
        self.status = JobStatus::InProgress;
        Ok(self.touch())
    }

    pub fn complete(self, reason: impl Into<String>, caveats: Vec<String>) -> Self {
        if self.is_terminal() {
            return self;
        }
        let mut state = self.terminate(JobStatus::Completed, reason);
        state.caveats = caveats;
        state
    }

    pub fn escalate(self, summary: EscalationSummary) -> Self {
        if self.is_terminal() {
            return self;
        }
        let reason = summary.reason.clone();
        let mut state = self.terminate(JobStatus::Escalated, reason);
        state.escalation = Some(summary);
        state
    }

    pub fn fail(self, reason: impl Into<String>) -> Self {
        if self.is_terminal() {
            return self;
        }
        self.terminate(JobStatus::Failed, reason)
    }

    fn terminate(mut self, status: JobStatus, reason: impl Into<String>) -> Self {
        self.status = status;
        self.termination_reason = Some(reason.into());
        self.pending_questions.clear();
        self.touch()
    }

    // ── Rounds & Facts ───────────────────────────────────────────────

    /// Store the confidence recomputed from the current facts.
    pub fn with_confidence(mut self, confidence: u8) -> CustomsResult<Self> {
        self.ensure_active()?;
        self.overall_confidence = confidence.min(100);
        Ok(self)
    }

    /// Append an executed round. The round number must be the next one.
    pub fn append_round(mut self, round: Round) -> CustomsResult<Self> {
        self.ensure_active()?;
        let expected = self.next_round_number();
        if round.round_number != expected {
            return Err(CustomsError::RoundOutOfOrder {
                expected,
                got: round.round_number,
            });
        }
        self.overall_confidence = round.confidence_after;
        self.confidence_trajectory.push(round.confidence_after);
        self.rounds.push(round);
        self.current_round = self.rounds.len() as u32;
        Ok(self.touch())
    }

    pub fn merge_facts(mut self, update: Facts) -> CustomsResult<Self> {
        self.ensure_active()?;
        self.current_state = self.current_state.merge(update);
        Ok(self.touch())
    }

    pub fn clear_facts(mut self, keys: &[FactKey]) -> CustomsResult<Self> {
        self.ensure_active()?;
        self.current_state = self.current_state.clear(keys);
        Ok(self.touch())
    }

    /// Count a self-healing attempt and null the facts the corrective
    /// action will regenerate.
    pub fn begin_self_healing(mut self, action: &Action) -> CustomsResult<Self> {
        self.ensure_active()?;
        if !action.self_healing {
            return Err(CustomsError::InvalidTransition(format!(
                "{} is not a self-healing action",
                action.kind
            )));
        }
        self.self_healing_attempts += 1;
        if let Some(failed) = self
            .current_state
            .validation_result
            .as_ref()
            .filter(|v| !v.passed)
        {
            self.last_failed_validation = Some(failed.clone());
        }
        self.current_state = self.current_state.clear(&action.clears);
        Ok(self.touch())
    }
}
