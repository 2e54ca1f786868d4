//! Self-healing router: maps a failed validation to one corrective action
//!
//! The router does not mutate state. Every action it returns names the
//! facts that must be nulled before it runs, so the same failed validation
//! cannot be replayed without the targeted stage producing new output.

use customs_types::{Action, ActionKind, FactKey, IssueKind, SpecificRequest, ValidationIssue};

/// A new decision invalidates everything derived from the old one.
const DECISION_FACTS: [FactKey; 3] = [
    FactKey::Decision,
    FactKey::TaxData,
    FactKey::ComplianceData,
];

#[derive(Clone, Debug, Default)]
pub struct SelfHealingRouter;

impl SelfHealingRouter {
    pub fn new() -> Self {
        Self
    }

    /// Highest-severity issue; the earliest one wins ties.
    pub fn primary_issue<'a>(&self, issues: &'a [ValidationIssue]) -> Option<&'a ValidationIssue> {
        issues.iter().fold(None, |best, issue| match best {
            Some(b) if b.severity >= issue.severity => Some(b),
            _ => Some(issue),
        })
    }

    pub fn route(&self, issues: &[ValidationIssue]) -> Action {
        let Some(issue) = self.primary_issue(issues) else {
            return Action::new(
                ActionKind::Classify,
                "Validation failed without reported issues; re-classifying",
            )
            .with_request(SpecificRequest::feedback(
                "Previous classification failed validation. Re-examine the decision.",
            ))
            .healing(DECISION_FACTS);
        };

        match issue.kind {
            kind if kind.is_citation() => Action::new(
                ActionKind::Classify,
                format!("Citation issue ({kind:?}); re-classifying with enforced citations"),
            )
            .with_request(SpecificRequest {
                feedback: Some(format!(
                    "Every conclusion must cite the heading text, section/chapter notes or \
                     explanatory notes it relies on. Validator reported: {}",
                    issue.description
                )),
                enforce_citations: true,
                ..Default::default()
            })
            .healing(DECISION_FACTS),

            kind if kind.is_research() => {
                let focus = issues
                    .iter()
                    .filter(|i| i.kind.is_research() && !i.description.trim().is_empty())
                    .map(|i| i.description.trim())
                    .collect::<Vec<_>>()
                    .join("; ");
                Action::new(
                    ActionKind::FetchLegalSources,
                    "Legal context insufficient; expanding research",
                )
                .with_request(SpecificRequest {
                    expand_search: true,
                    focus_area: (!focus.is_empty()).then_some(focus),
                    ..Default::default()
                })
                .healing(
                    [FactKey::CandidateHeadings, FactKey::LegalResearch]
                        .into_iter()
                        .chain(DECISION_FACTS),
                )
            }

            IssueKind::TaxExtraction => Action::new(
                ActionKind::CalculateTax,
                "Tax data could not be validated; recalculating",
            )
            .with_request(SpecificRequest::feedback(issue.description.clone()))
            .healing([FactKey::TaxData]),

            IssueKind::ComplianceExtraction => Action::new(
                ActionKind::CheckCompliance,
                "Compliance data could not be validated; re-checking",
            )
            .with_request(SpecificRequest::feedback(issue.description.clone()))
            .healing([FactKey::ComplianceData]),

            IssueKind::HierarchyViolation => Action::new(
                ActionKind::Classify,
                "GRI hierarchy violated; re-classifying in strict rule order",
            )
            .with_request(SpecificRequest {
                feedback: Some(format!(
                    "Apply GRI 1 first and only move to later rules when it cannot decide. \
                     Validator reported: {}",
                    issue.description
                )),
                enforce_hierarchy: true,
                ..Default::default()
            })
            .healing(DECISION_FACTS),

            kind if kind.is_product() => Action::new(
                ActionKind::RefineProduct,
                "Essential character unclear; refining product composition",
            )
            .with_request(SpecificRequest {
                feedback: Some(issue.description.clone()),
                focus_area: Some(
                    "composite goods: component materials, their share of value and weight, \
                     and which component gives the essential character"
                        .to_string(),
                ),
                ..Default::default()
            })
            .healing(
                [FactKey::ProductProfile, FactKey::ProductReadiness]
                    .into_iter()
                    .chain(DECISION_FACTS),
            ),

            _ => Action::new(
                ActionKind::Classify,
                "Validation failed; re-classifying with validator feedback",
            )
            .with_request(SpecificRequest::feedback(issue.description.clone()))
            .healing(DECISION_FACTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use customs_types::Severity;

    fn issue(kind: IssueKind, severity: Severity, description: &str) -> ValidationIssue {
        ValidationIssue::new(kind, severity, description)
    }

    #[test]
    fn test_primary_issue_highest_severity_first_on_ties() {
        let issues = vec![
            issue(IssueKind::TaxExtraction, Severity::Medium, "a"),
            issue(IssueKind::NoCitations, Severity::High, "b"),
            issue(IssueKind::HierarchyViolation, Severity::High, "c"),
        ];
        let router = SelfHealingRouter::new();
        assert_eq!(router.primary_issue(&issues).unwrap().description, "b");
    }

    #[test]
    fn test_citation_issue_enforces_citations() {
        let action = SelfHealingRouter::new().route(&[issue(
            IssueKind::NoCitations,
            Severity::High,
            "no citations",
        )]);
        assert_eq!(action.kind, ActionKind::Classify);
        assert!(action.request().enforce_citations);
        assert!(action.self_healing);
        assert_eq!(
            action.clears,
            vec![
                FactKey::Decision,
                FactKey::TaxData,
                FactKey::ComplianceData,
                FactKey::ValidationResult
            ]
        );
    }

    #[test]
    fn test_reclassifying_routes_drop_downstream_facts() {
        let router = SelfHealingRouter::new();
        let routes = [
            router.route(&[]),
            router.route(&[issue(IssueKind::NoCitations, Severity::High, "")]),
            router.route(&[issue(IssueKind::MissingLegalContext, Severity::High, "")]),
            router.route(&[issue(IssueKind::HierarchyViolation, Severity::High, "")]),
            router.route(&[issue(IssueKind::CompositeInconsistency, Severity::High, "")]),
            router.route(&[issue(IssueKind::Unknown, Severity::Low, "")]),
        ];
        for action in routes {
            assert!(action.clears.contains(&FactKey::Decision), "{action:?}");
            assert!(action.clears.contains(&FactKey::TaxData), "{action:?}");
            assert!(action.clears.contains(&FactKey::ComplianceData), "{action:?}");
        }

        let tax = router.route(&[issue(IssueKind::TaxExtraction, Severity::High, "")]);
        assert!(!tax.clears.contains(&FactKey::Decision));
    }

    #[test]
    fn test_research_issues_aggregate_focus() {
        let action = SelfHealingRouter::new().route(&[
            issue(IssueKind::MissingLegalContext, Severity::High, "chapter 85 notes"),
            issue(IssueKind::TaxExtraction, Severity::Low, "rate missing"),
            issue(IssueKind::InsufficientResearch, Severity::Medium, "no BTI rulings"),
        ]);
        assert_eq!(action.kind, ActionKind::FetchLegalSources);
        let request = action.request();
        assert!(request.expand_search);
        assert_eq!(
            request.focus_area.as_deref(),
            Some("chapter 85 notes; no BTI rulings")
        );
        assert!(action.clears.contains(&FactKey::LegalResearch));
    }

    #[test]
    fn test_tax_and_compliance_routes() {
        let router = SelfHealingRouter::new();
        let tax = router.route(&[issue(IssueKind::TaxExtraction, Severity::High, "x")]);
        assert_eq!(tax.kind, ActionKind::CalculateTax);
        assert!(tax.clears.contains(&FactKey::TaxData));

        let compliance =
            router.route(&[issue(IssueKind::ComplianceExtraction, Severity::High, "y")]);
        assert_eq!(compliance.kind, ActionKind::CheckCompliance);
        assert!(compliance.clears.contains(&FactKey::ComplianceData));
    }

    #[test]
    fn test_hierarchy_enforces_order() {
        let action =
            SelfHealingRouter::new().route(&[issue(IssueKind::HierarchyViolation, Severity::High, "")]);
        assert_eq!(action.kind, ActionKind::Classify);
        assert!(action.request().enforce_hierarchy);
    }

    #[test]
    fn test_composite_issue_refines_product() {
        let action = SelfHealingRouter::new().route(&[issue(
            IssueKind::CompositeInconsistency,
            Severity::High,
            "components do not add up",
        )]);
        assert_eq!(action.kind, ActionKind::RefineProduct);
        assert!(action.clears.contains(&FactKey::ProductProfile));
        assert!(action.request().focus_area.is_some());
    }

    #[test]
    fn test_unknown_issue_falls_back_to_classify() {
        let action =
            SelfHealingRouter::new().route(&[issue(IssueKind::Unknown, Severity::Low, "odd")]);
        assert_eq!(action.kind, ActionKind::Classify);
        assert_eq!(action.request().feedback.as_deref(), Some("odd"));
    }

    #[test]
    fn test_no_issues_still_heals() {
        let action = SelfHealingRouter::new().route(&[]);
        assert!(action.self_healing);
        assert!(action.clears.contains(&FactKey::ValidationResult));
    }
}
