//! Decision engine: the ordered rule table that picks the next action
//!
//! Rules are evaluated top to bottom and the first match wins. The engine is
//! pure: it reads the state and a confidence value and returns an
//! [`Action`]; applying the action is the orchestrator's job.

use crate::healing::SelfHealingRouter;
use customs_types::{Action, ActionKind, ConversationState, SpecificRequest};
use serde::{Deserialize, Serialize};

/// Thresholds of the decision table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// Self-healing attempts allowed before escalating.
    pub max_self_healing_attempts: u32,
    /// Product readiness required before research starts.
    pub readiness_gate: u8,
    /// Minimum confidence to finalize once every stage has run.
    pub finalize_threshold: u8,
    /// Loop iterations per run, independent of `max_rounds`.
    pub max_iterations: u32,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            max_self_healing_attempts: 3,
            readiness_gate: 80,
            finalize_threshold: 60,
            max_iterations: 25,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    policy: DecisionPolicy,
    router: SelfHealingRouter,
}

impl DecisionEngine {
    pub fn new(policy: DecisionPolicy) -> Self {
        Self {
            policy,
            router: SelfHealingRouter::new(),
        }
    }

    pub fn policy(&self) -> &DecisionPolicy {
        &self.policy
    }

    pub fn decide(&self, state: &ConversationState, confidence: u8) -> Action {
        let facts = &state.current_state;

        // 1. resource bounds
        if state.current_round >= state.max_rounds {
            return Action::new(ActionKind::Escalate, "max rounds reached");
        }
        if state.self_healing_attempts >= self.policy.max_self_healing_attempts {
            return Action::new(ActionKind::Escalate, "self-healing exhausted");
        }

        // 2-3. product understanding
        let Some(profile) = facts.product_profile.as_ref() else {
            return Action::new(
                ActionKind::AnalyzeProduct,
                "No product profile yet; analysing the description",
            );
        };
        let readiness = facts.product_readiness.unwrap_or(0);
        if readiness < self.policy.readiness_gate {
            let missing = profile.missing_critical_fields();
            if !missing.is_empty() {
                return Action::new(
                    ActionKind::RequestUserInput,
                    format!("Critical product details missing: {}", missing.join(", ")),
                )
                .with_request(SpecificRequest {
                    questions: missing.iter().map(|f| clarification_question(f)).collect(),
                    ..Default::default()
                });
            }
            return Action::new(
                ActionKind::RefineProduct,
                format!(
                    "Product readiness {readiness} below {}; refining profile",
                    self.policy.readiness_gate
                ),
            )
            .with_request(SpecificRequest {
                focus_area: Some(
                    "materials, composition, function and essential character".to_string(),
                ),
                ..Default::default()
            });
        }

        // 4-7. research and decision
        if facts.candidate_headings.is_none() || facts.legal_research.is_none() {
            return Action::new(
                ActionKind::FetchLegalSources,
                "Candidate headings or legal research missing",
            );
        }
        if facts.precedents.is_none() {
            return Action::new(ActionKind::SearchPrecedents, "Precedent search not run yet");
        }
        if facts.decision.is_none() {
            return Action::new(ActionKind::Classify, "Ready to classify");
        }
        let Some(validation) = facts.validation_result.as_ref() else {
            return Action::new(ActionKind::Validate, "Decision not validated yet");
        };

        // 8. failed validation
        if !validation.passed {
            return self.router.route(&validation.issues);
        }

        // 9-10. downstream data
        if facts.tax_data.is_none() {
            return Action::new(ActionKind::CalculateTax, "Tax data missing");
        }
        if facts.compliance_data.is_none() {
            return Action::new(ActionKind::CheckCompliance, "Compliance data missing");
        }

        // 11. final gate
        if confidence >= self.policy.finalize_threshold {
            Action::new(
                ActionKind::Finalize,
                format!("All stages complete with confidence {confidence}"),
            )
        } else {
            Action::new(ActionKind::Escalate, "low confidence after all stages")
        }
    }
}

/// Next action under the default policy.
pub fn decide_next_action(state: &ConversationState, confidence: u8) -> Action {
    DecisionEngine::default().decide(state, confidence)
}

fn clarification_question(field: &str) -> String {
    match field {
        "name" => "What exactly is the product? Please give its common or trade name.".to_string(),
        "function" => {
            "What is the product's primary function, and how is it used?".to_string()
        }
        other => format!("Please describe the product's {other}."),
    }
}
