//! Agent endpoint configuration

use customs_types::ActionKind;
use serde::{Deserialize, Serialize};

/// Where the agents live and how to reach them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub use_system_proxy: bool,
    pub paths: AgentPaths,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 120,
            api_token: None,
            use_system_proxy: false,
            paths: AgentPaths::default(),
        }
    }
}

/// Path of each agent, relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentPaths {
    pub product_analysis: String,
    pub legal_research: String,
    pub precedent_search: String,
    pub classification: String,
    pub validation: String,
    pub tax_calculation: String,
    pub compliance_check: String,
}

impl Default for AgentPaths {
    fn default() -> Self {
        Self {
            product_analysis: "/agents/product-analysis".to_string(),
            legal_research: "/agents/legal-research".to_string(),
            precedent_search: "/agents/precedent-search".to_string(),
            classification: "/agents/classification".to_string(),
            validation: "/agents/validation".to_string(),
            tax_calculation: "/agents/tax-calculation".to_string(),
            compliance_check: "/agents/compliance-check".to_string(),
        }
    }
}

impl AgentsConfig {
    /// Full URL for an action, or `None` when no agent handles it.
    pub fn url_for(&self, kind: ActionKind) -> Option<String> {
        let path = match kind {
            ActionKind::AnalyzeProduct | ActionKind::RefineProduct => &self.paths.product_analysis,
            ActionKind::FetchLegalSources => &self.paths.legal_research,
            ActionKind::SearchPrecedents => &self.paths.precedent_search,
            ActionKind::Classify => &self.paths.classification,
            ActionKind::Validate => &self.paths.validation,
            ActionKind::CalculateTax => &self.paths.tax_calculation,
            ActionKind::CheckCompliance => &self.paths.compliance_check,
            ActionKind::RequestUserInput | ActionKind::Finalize | ActionKind::Escalate => {
                return None
            }
        };
        Some(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let config = AgentsConfig {
            base_url: "http://agents.local/".into(),
            ..Default::default()
        };
        assert_eq!(
            config.url_for(ActionKind::Classify).as_deref(),
            Some("http://agents.local/agents/classification")
        );
        assert_eq!(
            config.url_for(ActionKind::RefineProduct),
            config.url_for(ActionKind::AnalyzeProduct)
        );
        assert!(config.url_for(ActionKind::Finalize).is_none());
    }
}
