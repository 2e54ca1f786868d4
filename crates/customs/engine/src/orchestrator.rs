//! Conversation orchestrator: the bounded control loop of a job
//!
//! Each iteration recomputes confidence from the current facts, asks the
//! decision engine for the next action and either ends the run (finalize,
//! escalate, ask the user) or executes one agent round. Every round is
//! checkpointed before the next decision, so an interrupted run resumes
//! exactly where it stopped.

use crate::confidence::{ConfidenceModel, ConfidenceWeights};
use crate::decision::{DecisionEngine, DecisionPolicy};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::escalation::{build_summary, completion_caveats};
use crate::invoker::{AgentInvoker, AgentOutcome, AgentRequest, JobContext};
use crate::notifier::{JobEvent, JobNotifier, TracingNotifier};
use crate::precheck::{merge_prechecks, run_prechecks};
use crate::state_store::{LoadOutcome, StateStore};
use chrono::Utc;
use customs_storage::{CustomsStorage, JobRecord};
use customs_types::{
    Action, ActionKind, ConversationState, CustomsError, EscalationSummary, Facts, JobId,
    JobStatus, Round, RoundOutcome,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Default question when an agent asks for input without saying what
const FALLBACK_QUESTION: &str = "Please describe the product in more detail: what it is, what it is made of and what it is used for.";

// ── Run Outcome ──────────────────────────────────────────────────────

/// Where a run stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    WaitingForUser {
        questions: Vec<String>,
    },
    Completed {
        confidence: u8,
        #[serde(skip_serializing_if = "Option::is_none")]
        hs_code: Option<String>,
        caveats: Vec<String>,
    },
    Escalated {
        reason: String,
        summary: EscalationSummary,
    },
    Failed {
        reason: String,
    },
}

impl RunOutcome {
    /// Outcome recorded in a persisted state, if the run stopped there.
    pub fn from_state(state: &ConversationState) -> Option<Self> {
        let reason = || state.termination_reason.clone().unwrap_or_default();
        match state.status {
            JobStatus::Completed => Some(Self::Completed {
                confidence: state.overall_confidence,
                hs_code: state.current_state.decision.as_ref().map(|d| d.hs_code.clone()),
                caveats: state.caveats.clone(),
            }),
            JobStatus::Escalated => Some(Self::Escalated {
                reason: reason(),
                summary: state
                    .escalation
                    .clone()
                    .unwrap_or_else(|| build_summary(state, &reason())),
            }),
            JobStatus::Failed => Some(Self::Failed { reason: reason() }),
            JobStatus::WaitingForUser => Some(Self::WaitingForUser {
                questions: state.pending_questions.clone(),
            }),
            JobStatus::Initializing | JobStatus::InProgress => None,
        }
    }
}

enum Step {
    Continue(ConversationState),
    Stop(RunOutcome),
}

// ── Orchestrator ─────────────────────────────────────────────────────

pub struct ConversationOrchestrator {
    store: StateStore,
    invoker: Arc<dyn AgentInvoker>,
    notifier: Arc<dyn JobNotifier>,
    confidence: ConfidenceModel,
    engine: DecisionEngine,
}

impl ConversationOrchestrator {
    pub fn new(storage: Arc<dyn CustomsStorage>, invoker: Arc<dyn AgentInvoker>) -> Self {
        Self {
            store: StateStore::new(storage),
            invoker,
            notifier: Arc::new(TracingNotifier),
            confidence: ConfidenceModel::default(),
            engine: DecisionEngine::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn JobNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.engine = DecisionEngine::new(policy);
        self
    }

    pub fn with_weights(mut self, weights: ConfidenceWeights) -> Self {
        self.confidence = ConfidenceModel::new(weights);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.store = self.store.with_max_rounds(max_rounds);
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    // ── Job Operations ───────────────────────────────────────────────

    pub async fn create_job(&self, job: JobRecord) -> OrchestratorResult<()> {
        tracing::info!(job_id = %job.job_id, "job registered");
        self.store.storage().create_job(job).await?;
        Ok(())
    }

    /// Current checkpoint, or the state a first run would start from.
    pub async fn job_state(&self, job_id: &JobId) -> OrchestratorResult<ConversationState> {
        let (_, outcome) = self.store.load(job_id).await?;
        Ok(outcome.into_state())
    }

    pub async fn request_abort(&self, job_id: &JobId) -> OrchestratorResult<()> {
        self.store.storage().request_abort(job_id).await?;
        tracing::warn!(job_id = %job_id, "abort requested");
        Ok(())
    }

    /// Record the user's answer to the pending clarification questions.
    pub async fn record_answer(
        &self,
        job_id: &JobId,
        answer: &str,
    ) -> OrchestratorResult<ConversationState> {
        let (_, outcome) = self.store.load(job_id).await?;
        let state = match outcome {
            LoadOutcome::Terminal(state) => {
                return Err(CustomsError::TerminalState {
                    job_id: state.job_id,
                    status: state.status,
                }
                .into())
            }
            other => other.into_state(),
        };
        let state = state.record_user_answer(answer)?;
        self.store.persist(&state).await?;
        tracing::info!(job_id = %job_id, answers = state.user_answers.len(), "user answer recorded");
        Ok(state)
    }

    // ── Control Loop ─────────────────────────────────────────────────

    /// Start or resume a job and run it until it stops.
    ///
    /// Terminal jobs return their recorded outcome without any change.
    /// An agent failure marks the job failed, persists it, and then
    /// surfaces as [`OrchestratorError::Agent`].
    pub async fn run(
        &self,
        job_id: &JobId,
        intended_use: Option<String>,
    ) -> OrchestratorResult<RunOutcome> {
        let (job, outcome) = self.store.load(job_id).await?;
        let state = match outcome {
            LoadOutcome::Terminal(state) => {
                tracing::info!(job_id = %job_id, status = %state.status, "job already terminal");
                return RunOutcome::from_state(&state).ok_or_else(|| {
                    CustomsError::InvalidTransition(format!("job {job_id} has no outcome")).into()
                });
            }
            LoadOutcome::AbortRequested(state) => return self.abort(state).await,
            LoadOutcome::Fresh(state) => {
                tracing::info!(job_id = %job_id, max_rounds = state.max_rounds, "starting job");
                state
            }
            LoadOutcome::Resume(state) => {
                tracing::info!(
                    job_id = %job_id,
                    round = state.current_round,
                    status = %state.status,
                    "resuming job from checkpoint"
                );
                state
            }
        };

        let context = JobContext {
            job_id: job.job_id.clone(),
            description: job.description.clone(),
            destination_country: job.destination_country.clone(),
            intended_use: intended_use.or_else(|| job.intended_use.clone()),
            user_answers: state.user_answers.clone(),
        };

        let mut state = state.start()?;
        self.store.persist(&state).await?;

        for iteration in 0..self.engine.policy().max_iterations {
            if iteration > 0 && self.store.abort_requested(job_id).await? {
                return self.abort(state).await;
            }

            let confidence = self.confidence.compute(&state.current_state);
            state = state.with_confidence(confidence)?;
            let action = self.engine.decide(&state, confidence);

            tracing::info!(
                job_id = %job_id,
                round = state.current_round,
                action = %action.kind,
                confidence,
                reason = %action.reason,
                "next action"
            );

            let step = match action.kind {
                ActionKind::Finalize => self.finalize(state, confidence).await?,
                ActionKind::Escalate => self.escalate(state, &action.reason).await?,
                ActionKind::RequestUserInput => {
                    self.ask_user(state, action.request().questions).await?
                }
                _ => self.execute_round(state, &action, &context).await?,
            };

            match step {
                Step::Continue(next) => state = next,
                Step::Stop(outcome) => return Ok(outcome),
            }
        }

        let reason = format!(
            "iteration ceiling of {} reached",
            self.engine.policy().max_iterations
        );
        match self.escalate(state, &reason).await? {
            Step::Stop(outcome) => Ok(outcome),
            Step::Continue(_) => Err(CustomsError::InvalidTransition(reason).into()),
        }
    }

    async fn execute_round(
        &self,
        mut state: ConversationState,
        action: &Action,
        context: &JobContext,
    ) -> OrchestratorResult<Step> {
        if action.self_healing {
            tracing::warn!(
                job_id = %state.job_id,
                attempt = state.self_healing_attempts + 1,
                action = %action.kind,
                cleared = ?action.clears,
                "self-healing"
            );
            state = state.begin_self_healing(action)?;
        }

        let round_number = state.next_round_number();
        let input_params = AgentRequest::build(action, context, &state.current_state).audit_params();
        let started = Instant::now();
        let result = self
            .invoker
            .invoke(action, context, &state.current_state)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let round = |outcome: RoundOutcome, summary: String, confidence_after: u8| Round {
            round_number,
            agent_name: action.kind.agent_name().map(String::from),
            action: action.kind,
            reason: action.reason.clone(),
            self_healing: action.self_healing,
            input_params: input_params.clone(),
            output_summary: summary,
            outcome,
            confidence_after,
            duration_ms,
            timestamp: Utc::now(),
        };

        match result {
            Ok(AgentOutcome::Facts { update, summary }) => {
                let mut state = state.merge_facts(update)?;
                if action.kind == ActionKind::Validate {
                    state = self.apply_prechecks(state)?;
                }
                let confidence = self.confidence.compute(&state.current_state);
                let state = state.append_round(round(RoundOutcome::Success, summary, confidence))?;
                self.store.persist(&state).await?;

                tracing::info!(
                    job_id = %state.job_id,
                    round = round_number,
                    action = %action.kind,
                    confidence,
                    duration_ms,
                    "round complete"
                );
                Ok(Step::Continue(state))
            }
            Ok(AgentOutcome::NeedsInput { questions, summary }) => {
                let questions = if questions.is_empty() {
                    vec![FALLBACK_QUESTION.to_string()]
                } else {
                    questions
                };
                let confidence = state.overall_confidence;
                let state = state.append_round(round(
                    RoundOutcome::NeedsInput {
                        questions: questions.clone(),
                    },
                    summary,
                    confidence,
                ))?;
                self.ask_user(state, questions).await
            }
            Err(err) => {
                tracing::error!(
                    job_id = %state.job_id,
                    round = round_number,
                    action = %action.kind,
                    error = %err,
                    "agent invocation failed"
                );
                let confidence = state.overall_confidence;
                let message = err.to_string();
                let state = state
                    .append_round(round(
                        RoundOutcome::Error {
                            message: message.clone(),
                        },
                        format!("{} failed", action.kind),
                        confidence,
                    ))?
                    .fail(format!("{} failed: {message}", action.kind));
                self.store.persist(&state).await?;
                self.notifier
                    .notify(&JobEvent::Failed {
                        job_id: state.job_id.clone(),
                        reason: state.termination_reason.clone().unwrap_or_default(),
                    })
                    .await;
                Err(OrchestratorError::Agent {
                    action: action.kind,
                    source: err,
                })
            }
        }
    }

    fn apply_prechecks(&self, state: ConversationState) -> OrchestratorResult<ConversationState> {
        let issues = run_prechecks(&state.current_state);
        let merged = merge_prechecks(state.current_state.validation_result.clone(), issues);
        if !merged.passed {
            tracing::warn!(
                job_id = %state.job_id,
                issues = merged.issues.len(),
                "validation failed"
            );
        }
        Ok(state.merge_facts(Facts {
            validation_result: Some(merged),
            ..Default::default()
        })?)
    }

    // ── Terminal Steps ───────────────────────────────────────────────

    async fn finalize(&self, state: ConversationState, confidence: u8) -> OrchestratorResult<Step> {
        let caveats = completion_caveats(&state, confidence);
        let state = state.complete(
            format!("finalized with confidence {confidence}"),
            caveats.clone(),
        );
        self.store.persist(&state).await?;

        let hs_code = state.current_state.decision.as_ref().map(|d| d.hs_code.clone());
        self.notifier
            .notify(&JobEvent::Completed {
                job_id: state.job_id.clone(),
                confidence,
                hs_code: hs_code.clone(),
            })
            .await;
        Ok(Step::Stop(RunOutcome::Completed {
            confidence,
            hs_code,
            caveats,
        }))
    }

    async fn escalate(&self, state: ConversationState, reason: &str) -> OrchestratorResult<Step> {
        let summary = build_summary(&state, reason);
        let state = state.escalate(summary.clone());
        self.store.persist(&state).await?;
        self.notifier
            .notify(&JobEvent::Escalated {
                job_id: state.job_id.clone(),
                summary: summary.clone(),
            })
            .await;
        Ok(Step::Stop(RunOutcome::Escalated {
            reason: reason.to_string(),
            summary,
        }))
    }

    async fn ask_user(
        &self,
        state: ConversationState,
        questions: Vec<String>,
    ) -> OrchestratorResult<Step> {
        let state = state.await_user(questions.clone())?;
        self.store.persist(&state).await?;
        self.notifier
            .notify(&JobEvent::WaitingForUser {
                job_id: state.job_id.clone(),
                questions: questions.clone(),
            })
            .await;
        Ok(Step::Stop(RunOutcome::WaitingForUser { questions }))
    }

    async fn abort(&self, state: ConversationState) -> OrchestratorResult<RunOutcome> {
        let reason = "aborted by operator".to_string();
        let state = state.fail(reason.clone());
        self.store.persist(&state).await?;
        self.notifier
            .notify(&JobEvent::Failed {
                job_id: state.job_id.clone(),
                reason: reason.clone(),
            })
            .await;
        Ok(RunOutcome::Failed { reason })
    }
}
