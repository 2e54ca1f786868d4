//! Confidence model: a 0-100 score derived purely from the current facts
//!
//! Six category scores are combined with fixed weights, then fixed
//! penalties are subtracted. The result is clamped and rounded. No clock,
//! randomness or history is consulted, so the same facts always yield the
//! same score.

use customs_types::{ClassificationDecision, Facts, GriRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category weights and penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub product: f64,
    pub legal: f64,
    pub decision: f64,
    pub citations: f64,
    pub precedent: f64,
    pub validation: f64,
    pub conflicting_precedent_penalty: f64,
    /// Applied when the decision rests on the weakest GRI rule.
    pub weakest_rule_penalty: f64,
    pub context_gap_penalty: f64,
    /// More unresolved context gaps than this triggers the gap penalty.
    pub max_context_gaps: usize,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            product: 0.15,
            legal: 0.25,
            decision: 0.25,
            citations: 0.15,
            precedent: 0.10,
            validation: 0.10,
            conflicting_precedent_penalty: 10.0,
            weakest_rule_penalty: 10.0,
            context_gap_penalty: 5.0,
            max_context_gaps: 3,
        }
    }
}

/// Per-category scores behind a confidence value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub product: f64,
    pub legal: f64,
    pub decision: f64,
    pub citations: f64,
    pub precedent: f64,
    pub validation: f64,
    pub penalties: f64,
    pub total: u8,
}

#[derive(Debug, Clone, Default)]
pub struct ConfidenceModel {
    weights: ConfidenceWeights,
}

impl ConfidenceModel {
    pub fn new(weights: ConfidenceWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ConfidenceWeights {
        &self.weights
    }

    pub fn compute(&self, facts: &Facts) -> u8 {
        self.breakdown(facts).total
    }

    pub fn breakdown(&self, facts: &Facts) -> ConfidenceBreakdown {
        let w = &self.weights;
        let product = product_score(facts);
        let legal = legal_score(facts);
        let decision = decision_score(facts.decision.as_ref());
        let citations = citation_score(facts.decision.as_ref());
        let precedent = precedent_score(facts);
        let validation = validation_score(facts);

        let weighted = product * w.product
            + legal * w.legal
            + decision * w.decision
            + citations * w.citations
            + precedent * w.precedent
            + validation * w.validation;

        let mut penalties: f64 = 0.0;
        if facts.precedents.as_ref().is_some_and(|p| p.has_conflict()) {
            penalties += w.conflicting_precedent_penalty;
        }
        if decision_rule(facts.decision.as_ref()).is_some_and(|r| r.is_weakest()) {
            penalties += w.weakest_rule_penalty;
        }
        if facts
            .legal_research
            .as_ref()
            .is_some_and(|l| l.context_gaps.len() > w.max_context_gaps)
        {
            penalties += w.context_gap_penalty;
        }

        let total = (weighted - penalties).clamp(0.0, 100.0).round() as u8;

        ConfidenceBreakdown {
            product,
            legal,
            decision,
            citations,
            precedent,
            validation,
            penalties,
            total,
        }
    }
}

/// Confidence under the default weights.
pub fn compute_confidence(facts: &Facts) -> u8 {
    ConfidenceModel::default().compute(facts)
}

// ── Category Scores ──────────────────────────────────────────────────

fn product_score(facts: &Facts) -> f64 {
    let Some(profile) = facts.product_profile.as_ref() else {
        return 0.0;
    };
    let mut score = f64::from(facts.product_readiness.unwrap_or(0).min(100));
    if profile.has_essential_character() {
        score += 10.0;
    }
    if !profile.components.is_empty() {
        score += 5.0;
    }
    score.min(100.0)
}

fn legal_score(facts: &Facts) -> f64 {
    let Some(research) = facts.legal_research.as_ref() else {
        return 0.0;
    };
    let mut score: f64 = 40.0;
    score += match research.reference_text.chars().count() {
        n if n >= 5_000 => 25.0,
        n if n >= 1_000 => 15.0,
        0 => 0.0,
        _ => 5.0,
    };
    if !research.documents.is_empty() {
        score += 15.0;
    }
    if research.has_top_tier_source() {
        score += 20.0;
    }
    score.min(100.0)
}

fn decision_rule(decision: Option<&ClassificationDecision>) -> Option<GriRule> {
    decision?.rule.as_deref().and_then(GriRule::parse)
}

fn decision_score(decision: Option<&ClassificationDecision>) -> f64 {
    let Some(decision) = decision else {
        return 0.0;
    };
    let mut score = decision_rule(Some(decision)).map_or(50.0, |r| f64::from(r.strength()));
    if decision.essential_character_breakdown.is_some() {
        score += 5.0;
    }
    score.min(100.0)
}

fn citation_score(decision: Option<&ClassificationDecision>) -> f64 {
    let Some(decision) = decision else {
        return 0.0;
    };
    let Some(citations) = decision.citations.as_ref() else {
        // decided, but citations never evaluated
        return 50.0;
    };
    let distinct: BTreeSet<String> = citations
        .iter()
        .map(|c| c.source.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    let volume = (citations.len().min(4) * 15) as f64;
    let diversity = (distinct.len().min(2) * 20) as f64;
    (volume + diversity).min(100.0)
}

fn precedent_score(facts: &Facts) -> f64 {
    match facts.precedents.as_ref() {
        None => 0.0,
        Some(p) if p.cases.is_empty() => 40.0,
        Some(p) => (60.0 + 10.0 * p.cases.len().min(4) as f64).min(100.0),
    }
}

fn validation_score(facts: &Facts) -> f64 {
    let Some(validation) = facts.validation_result.as_ref() else {
        return 0.0;
    };
    let base = if validation.passed {
        validation.score.unwrap_or(90.0).clamp(0.0, 100.0)
    } else {
        20.0
    };
    match facts
        .legal_research
        .as_ref()
        .and_then(|l| l.retrieval_quality)
    {
        Some(quality) => (base + quality.clamp(0.0, 100.0)) / 2.0,
        None => base,
    }
}
