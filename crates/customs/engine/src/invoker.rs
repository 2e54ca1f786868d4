//! Agent invocation seam
//!
//! The orchestrator never talks to an agent directly. It hands an
//! [`Action`] to an [`AgentInvoker`], which calls the external agent and
//! returns either a normalized fact update or a request for user input.

use async_trait::async_trait;
use customs_types::{Action, ActionKind, Facts, JobId, UserAnswer};
use serde::Serialize;

/// Job-level context shared with every agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobContext {
    pub job_id: JobId,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intended_use: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_answers: Vec<UserAnswer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnforceFlags {
    pub citations: bool,
    pub hierarchy: bool,
    pub expand_search: bool,
}

/// Request body sent to an agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRequest<'a> {
    pub job_id: &'a JobId,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<&'a str>,
    pub enforce_flags: EnforceFlags,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<&'a str>,
    pub context: &'a JobContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facts: Option<&'a Facts>,
}

impl<'a> AgentRequest<'a> {
    pub fn build(action: &'a Action, context: &'a JobContext, facts: &'a Facts) -> Self {
        let request = action.specific_request.as_ref();
        Self {
            job_id: &context.job_id,
            action: action.kind,
            feedback: request.and_then(|r| r.feedback.as_deref()),
            enforce_flags: request
                .map(|r| EnforceFlags {
                    citations: r.enforce_citations,
                    hierarchy: r.enforce_hierarchy,
                    expand_search: r.expand_search,
                })
                .unwrap_or_default(),
            focus_area: request.and_then(|r| r.focus_area.as_deref()),
            context,
            facts: Some(facts),
        }
    }

    /// Audit form recorded in the round log, without the fact payload.
    pub fn audit_params(&self) -> serde_json::Value {
        let audit = Self {
            facts: None,
            ..self.clone()
        };
        serde_json::to_value(&audit).unwrap_or(serde_json::Value::Null)
    }
}

/// Normalized result of one agent call
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    /// Facts to merge into the job state
    Facts { update: Facts, summary: String },
    /// The agent cannot proceed without the user
    NeedsInput {
        questions: Vec<String>,
        summary: String,
    },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AgentError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("agent returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed agent response: {0}")]
    Malformed(String),

    #[error("agent reported error: {0}")]
    Reported(String),

    #[error("no agent handles {0}")]
    Unsupported(ActionKind),
}

#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(
        &self,
        action: &Action,
        context: &JobContext,
        facts: &Facts,
    ) -> Result<AgentOutcome, AgentError>;
}
