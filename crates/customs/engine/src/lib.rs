//! Confidence-driven orchestration of customs classification
//!
//! The engine sequences calls to external classification agents until a job
//! is finalized, needs the user, or must be escalated to a human reviewer.
//!
//! # Key Principle
//!
//! **Every decision is a pure function of the persisted state.**
//!
//! Confidence is recomputed from the current facts on every iteration and
//! the next action comes from a fixed rule table. Resuming from a checkpoint
//! therefore picks exactly the action an uninterrupted run would have picked.
//!
//! # Architecture
//!
//! The [`ConversationOrchestrator`] composes specialized components:
//!
//! - [`ConfidenceModel`]: weighted 0-100 score over the current facts
//! - [`DecisionEngine`]: ordered rule table producing the next [`Action`]
//! - [`SelfHealingRouter`]: maps a failed validation to a corrective action
//! - [`StateStore`]: loads, resumes and checkpoints conversation state
//! - [`AgentInvoker`]: seam to the external agents
//! - [`JobNotifier`]: reports jobs that stop running
//!
//! [`Action`]: customs_types::Action

#![deny(unsafe_code)]

pub mod confidence;
pub mod decision;
pub mod error;
pub mod escalation;
pub mod healing;
pub mod invoker;
pub mod notifier;
pub mod orchestrator;
pub mod precheck;
pub mod state_store;

pub use confidence::{compute_confidence, ConfidenceBreakdown, ConfidenceModel, ConfidenceWeights};
pub use decision::{decide_next_action, DecisionEngine, DecisionPolicy};
pub use error::{OrchestratorError, OrchestratorResult};
pub use escalation::{build_summary, completion_caveats};
pub use healing::SelfHealingRouter;
pub use invoker::{AgentError, AgentInvoker, AgentOutcome, AgentRequest, EnforceFlags, JobContext};
pub use notifier::{JobEvent, JobNotifier, TracingNotifier};
pub use orchestrator::{ConversationOrchestrator, RunOutcome};
pub use precheck::{merge_prechecks, run_prechecks};
pub use state_store::{LoadOutcome, StateStore};
