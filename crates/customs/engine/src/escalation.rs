//! Escalation summaries and completion caveats
//!
//! Escalation always hands a reviewer a structured summary: the last few
//! rounds, the best classification so far, outstanding validation issues
//! and concrete recommendations.

use customs_types::{
    BestGuess, ConversationState, EscalationSummary, RoundDigest, Severity, ValidationResult,
};

/// Number of trailing rounds included in a summary
pub const RECENT_ROUNDS: usize = 5;

/// Confidence below which a completed job carries a caveat
pub const CAVEAT_CONFIDENCE: u8 = 85;

pub fn build_summary(state: &ConversationState, reason: &str) -> EscalationSummary {
    let facts = &state.current_state;

    let recent_rounds = state
        .rounds
        .iter()
        .rev()
        .take(RECENT_ROUNDS)
        .rev()
        .map(|r| RoundDigest {
            round_number: r.round_number,
            action: r.action,
            agent_name: r.agent_name.clone(),
            outcome: r.outcome.clone(),
            confidence_after: r.confidence_after,
        })
        .collect();

    let best_guess = facts.decision.as_ref().map(|d| BestGuess {
        hs_code: d.hs_code.clone(),
        rule: d.rule.clone(),
        confidence: state.overall_confidence,
    });

    let outstanding_issues = latest_validation(state)
        .map(|v| v.issues.clone())
        .unwrap_or_default();

    EscalationSummary {
        reason: reason.to_string(),
        recent_rounds,
        best_guess,
        outstanding_issues,
        recommendations: recommendations(state),
        confidence_trajectory: state.confidence_trajectory.clone(),
    }
}

/// The current validation, or the failure that triggered the last
/// self-healing attempt when healing has since cleared it.
fn latest_validation(state: &ConversationState) -> Option<&ValidationResult> {
    state
        .current_state
        .validation_result
        .as_ref()
        .or(state.last_failed_validation.as_ref())
}

fn recommendations(state: &ConversationState) -> Vec<String> {
    let facts = &state.current_state;
    let mut out = Vec::new();

    if facts.decision.is_none() {
        out.push("Classify manually: no decision was produced".to_string());
    }
    if let Some(validation) = latest_validation(state).filter(|v| !v.passed) {
        let kinds: Vec<String> = validation
            .issues
            .iter()
            .map(|i| format!("{:?}", i.kind))
            .collect();
        out.push(format!(
            "Review failed validation ({})",
            if kinds.is_empty() {
                "no issues reported".to_string()
            } else {
                kinds.join(", ")
            }
        ));
    }
    if state.self_healing_attempts > 0 {
        out.push(format!(
            "Automatic correction was attempted {} time(s); check whether the agents received \
             enough context",
            state.self_healing_attempts
        ));
    }
    if facts.precedents.as_ref().is_some_and(|p| p.has_conflict()) {
        out.push("Resolve conflicting precedent rulings".to_string());
    }
    if let Some(research) = facts.legal_research.as_ref() {
        if !research.context_gaps.is_empty() {
            out.push(format!(
                "Supply missing legal context: {}",
                research.context_gaps.join("; ")
            ));
        }
    }
    if state.rounds.iter().any(|r| r.outcome.is_error()) {
        out.push("Inspect agent errors in the round log".to_string());
    }
    if out.is_empty() {
        out.push("Confirm the best-guess classification".to_string());
    }
    out
}

/// Residual caveats reported alongside a completed classification.
pub fn completion_caveats(state: &ConversationState, confidence: u8) -> Vec<String> {
    let facts = &state.current_state;
    let mut caveats = Vec::new();

    if confidence < CAVEAT_CONFIDENCE {
        caveats.push(format!("Confidence {confidence} is below {CAVEAT_CONFIDENCE}"));
    }
    if let Some(validation) = facts.validation_result.as_ref() {
        caveats.extend(
            validation
                .issues
                .iter()
                .filter(|i| i.severity < Severity::High)
                .map(|i| format!("{:?}: {}", i.kind, i.description)),
        );
    }
    if facts.precedents.as_ref().is_some_and(|p| p.has_conflict()) {
        caveats.push("Conflicting precedent rulings exist".to_string());
    }
    if let Some(research) = facts.legal_research.as_ref() {
        if !research.context_gaps.is_empty() {
            caveats.push(format!(
                "{} unresolved legal context gap(s)",
                research.context_gaps.len()
            ));
        }
    }
    caveats
}
