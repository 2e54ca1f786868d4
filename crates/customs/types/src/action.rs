//! Actions chosen by the decision table

use crate::FactKey;
use serde::{Deserialize, Serialize};

/// Fixed enumeration of next steps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    AnalyzeProduct,
    RefineProduct,
    RequestUserInput,
    FetchLegalSources,
    SearchPrecedents,
    Classify,
    Validate,
    CalculateTax,
    CheckCompliance,
    Finalize,
    Escalate,
}

impl ActionKind {
    /// Agent invoked for this action; `None` for actions the orchestrator
    /// handles itself.
    pub fn agent_name(&self) -> Option<&'static str> {
        match self {
            Self::AnalyzeProduct | Self::RefineProduct => Some("product_analysis"),
            Self::FetchLegalSources => Some("legal_research"),
            Self::SearchPrecedents => Some("precedent_search"),
            Self::Classify => Some("classification"),
            Self::Validate => Some("validation"),
            Self::CalculateTax => Some("tax_calculation"),
            Self::CheckCompliance => Some("compliance_check"),
            Self::RequestUserInput | Self::Finalize | Self::Escalate => None,
        }
    }

    /// Actions that end the current run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RequestUserInput | Self::Finalize | Self::Escalate)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalyzeProduct => "ANALYZE_PRODUCT",
            Self::RefineProduct => "REFINE_PRODUCT",
            Self::RequestUserInput => "REQUEST_USER_INPUT",
            Self::FetchLegalSources => "FETCH_LEGAL_SOURCES",
            Self::SearchPrecedents => "SEARCH_PRECEDENTS",
            Self::Classify => "CLASSIFY",
            Self::Validate => "VALIDATE",
            Self::CalculateTax => "CALCULATE_TAX",
            Self::CheckCompliance => "CHECK_COMPLIANCE",
            Self::Finalize => "FINALIZE",
            Self::Escalate => "ESCALATE",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feedback and enforcement flags passed along with an action
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enforce_citations: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub enforce_hierarchy: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub expand_search: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    /// Clarification questions for the user
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<String>,
}

impl SpecificRequest {
    pub fn feedback(text: impl Into<String>) -> Self {
        Self {
            feedback: Some(text.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub kind: ActionKind,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_request: Option<SpecificRequest>,
    /// Set when the action is a corrective re-run after a failed validation
    #[serde(default)]
    pub self_healing: bool,
    /// Facts nulled before the action runs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clears: Vec<FactKey>,
}

impl Action {
    pub fn new(kind: ActionKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            specific_request: None,
            self_healing: false,
            clears: Vec::new(),
        }
    }

    pub fn with_request(mut self, request: SpecificRequest) -> Self {
        self.specific_request = Some(request);
        self
    }

    /// Mark as a self-healing re-run that nulls `clears` first.
    ///
    /// The failed validation result is always among the cleared facts.
    pub fn healing(mut self, clears: impl IntoIterator<Item = FactKey>) -> Self {
        self.self_healing = true;
        self.clears = clears.into_iter().collect();
        if !self.clears.contains(&FactKey::ValidationResult) {
            self.clears.push(FactKey::ValidationResult);
        }
        self
    }

    pub fn request(&self) -> SpecificRequest {
        self.specific_request.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_names() {
        assert_eq!(ActionKind::Classify.agent_name(), Some("classification"));
        assert_eq!(
            ActionKind::RefineProduct.agent_name(),
            ActionKind::AnalyzeProduct.agent_name()
        );
        assert!(ActionKind::Finalize.agent_name().is_none());
        assert!(ActionKind::RequestUserInput.agent_name().is_none());
    }

    #[test]
    fn test_terminal_actions_have_no_agent() {
        for kind in [
            ActionKind::RequestUserInput,
            ActionKind::Finalize,
            ActionKind::Escalate,
        ] {
            assert!(kind.is_terminal());
            assert!(kind.agent_name().is_none());
        }
    }

    #[test]
    fn test_healing_always_clears_validation() {
        let action = Action::new(ActionKind::CalculateTax, "retry").healing([FactKey::TaxData]);
        assert!(action.self_healing);
        assert_eq!(
            action.clears,
            vec![FactKey::TaxData, FactKey::ValidationResult]
        );
    }

    #[test]
    fn test_action_kind_wire_name() {
        let json = serde_json::to_string(&ActionKind::FetchLegalSources).unwrap();
        assert_eq!(json, "\"FETCH_LEGAL_SOURCES\"");
        assert_eq!(ActionKind::FetchLegalSources.to_string(), "FETCH_LEGAL_SOURCES");
    }
}
