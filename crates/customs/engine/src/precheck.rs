//! Rule-based prechecks merged into every validation result
//!
//! These checks need no agent: HS-code format, citation presence and the
//! GRI hierarchy preconditions. A blocking precheck issue fails the
//! validation even when the validation agent passed it.

use customs_types::{
    ClassificationDecision, Facts, GriRule, IssueKind, Severity, ValidationIssue, ValidationResult,
};

/// Run every precheck against the current decision.
pub fn run_prechecks(facts: &Facts) -> Vec<ValidationIssue> {
    let Some(decision) = facts.decision.as_ref() else {
        return Vec::new();
    };

    let mut issues = Vec::new();
    if let Some(issue) = check_hs_code(&decision.hs_code) {
        issues.push(issue);
    }
    if let Some(issue) = check_citations(decision) {
        issues.push(issue);
    }
    issues.extend(check_hierarchy(decision, facts));
    issues
}

/// Merge precheck issues into a validation result.
///
/// With no agent result, the prechecks alone decide the outcome.
pub fn merge_prechecks(
    result: Option<ValidationResult>,
    issues: Vec<ValidationIssue>,
) -> ValidationResult {
    let blocking = issues.iter().any(|i| i.severity.is_blocking());
    let mut result = result.unwrap_or_else(|| ValidationResult {
        passed: true,
        ..Default::default()
    });

    for issue in issues {
        if !result.issues.iter().any(|existing| existing.kind == issue.kind) {
            result.issues.push(issue);
        }
    }
    result.passed = result.passed && !blocking;
    result
}

fn check_hs_code(hs_code: &str) -> Option<ValidationIssue> {
    let compact: String = hs_code.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
    let valid = (6..=10).contains(&compact.len()) && compact.chars().all(|c| c.is_ascii_digit());
    (!valid).then(|| {
        ValidationIssue::new(
            IssueKind::InvalidHsCode,
            Severity::High,
            format!("HS code '{hs_code}' must contain 6 to 10 digits"),
        )
    })
}

fn check_citations(decision: &ClassificationDecision) -> Option<ValidationIssue> {
    match decision.citations.as_deref() {
        None => Some(ValidationIssue::new(
            IssueKind::InsufficientCitations,
            Severity::Low,
            "Citations were not provided with the decision",
        )),
        Some([]) => Some(ValidationIssue::new(
            IssueKind::NoCitations,
            Severity::High,
            "The decision does not cite any legal source",
        )),
        Some(citations) if citations.iter().any(|c| c.source.trim().is_empty()) => {
            Some(ValidationIssue::new(
                IssueKind::CitationFormat,
                Severity::Medium,
                "One or more citations have no source",
            ))
        }
        Some(_) => None,
    }
}

fn check_hierarchy(decision: &ClassificationDecision, facts: &Facts) -> Vec<ValidationIssue> {
    let Some(rule) = decision.rule.as_deref().and_then(GriRule::parse) else {
        return Vec::new();
    };

    let mut issues = Vec::new();
    match rule {
        GriRule::Gri3b => {
            if decision.essential_character_breakdown.is_none() {
                issues.push(ValidationIssue::new(
                    IssueKind::HierarchyViolation,
                    Severity::High,
                    "GRI 3(b) applied without an essential-character breakdown",
                ));
            }
            let composite = facts
                .product_profile
                .as_ref()
                .is_some_and(|p| !p.components.is_empty());
            if !composite {
                issues.push(ValidationIssue::new(
                    IssueKind::CompositeInconsistency,
                    Severity::Medium,
                    "GRI 3(b) applied but the product profile lists no components",
                ));
            }
        }
        GriRule::Gri4 => {
            let has_precedent = facts
                .precedents
                .as_ref()
                .is_some_and(|p| !p.cases.is_empty());
            if !has_precedent {
                issues.push(ValidationIssue::new(
                    IssueKind::HierarchyViolation,
                    Severity::Medium,
                    "GRI 4 applied without any precedent for the most akin goods",
                ));
            }
        }
        _ => {}
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use customs_types::{Citation, PrecedentCase, Precedents};

    fn decision(hs_code: &str, rule: Option<&str>, citations: Option<Vec<&str>>) -> Facts {
        Facts {
            decision: Some(ClassificationDecision {
                hs_code: hs_code.into(),
                rule: rule.map(Into::into),
                citations: citations.map(|srcs| {
                    srcs.into_iter()
                        .map(|s| Citation {
                            source: s.into(),
                            ..Default::default()
                        })
                        .collect()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_decision_no_issues() {
        assert!(run_prechecks(&Facts::default()).is_empty());
    }

    #[test]
    fn test_clean_decision_passes() {
        let facts = decision("8471.30.01", Some("GRI 1"), Some(vec!["HS heading 8471"]));
        assert!(run_prechecks(&facts).is_empty());
    }

    #[test]
    fn test_hs_code_format() {
        for bad in ["84", "8471.3x", "12345678901"] {
            let issues = run_prechecks(&decision(bad, None, Some(vec!["x"])));
            assert_eq!(issues[0].kind, IssueKind::InvalidHsCode, "{bad}");
        }
        assert!(run_prechecks(&decision("8471 30", None, Some(vec!["x"]))).is_empty());
    }

    #[test]
    fn test_citation_checks() {
        let empty = run_prechecks(&decision("847130", None, Some(vec![])));
        assert_eq!(empty[0].kind, IssueKind::NoCitations);
        assert!(empty[0].severity.is_blocking());

        let missing = run_prechecks(&decision("847130", None, None));
        assert_eq!(missing[0].kind, IssueKind::InsufficientCitations);
        assert!(!missing[0].severity.is_blocking());

        let blank = run_prechecks(&decision("847130", None, Some(vec!["  "])));
        assert_eq!(blank[0].kind, IssueKind::CitationFormat);
    }

    #[test]
    fn test_gri3b_requires_breakdown() {
        let issues = run_prechecks(&decision("950300", Some("GRI 3(b)"), Some(vec!["x"])));
        let kinds: Vec<_> = issues.iter().map(|i| i.kind).collect();
        assert_eq!(
            kinds,
            vec![IssueKind::HierarchyViolation, IssueKind::CompositeInconsistency]
        );
    }

    #[test]
    fn test_gri4_with_precedent_is_fine() {
        let mut facts = decision("950300", Some("GRI 4"), Some(vec!["x"]));
        assert_eq!(run_prechecks(&facts).len(), 1);
        facts.precedents = Some(Precedents {
            cases: vec![PrecedentCase::default()],
            ..Default::default()
        });
        assert!(run_prechecks(&facts).is_empty());
    }

    #[test]
    fn test_merge_blocking_issue_fails_validation() {
        let agent = ValidationResult {
            passed: true,
            score: Some(88.0),
            ..Default::default()
        };
        let merged = merge_prechecks(
            Some(agent),
            vec![ValidationIssue::new(IssueKind::NoCitations, Severity::High, "none")],
        );
        assert!(!merged.passed);
        assert_eq!(merged.issues.len(), 1);
    }

    #[test]
    fn test_merge_skips_duplicate_kinds() {
        let agent = ValidationResult {
            passed: false,
            issues: vec![ValidationIssue::new(IssueKind::NoCitations, Severity::High, "agent")],
            ..Default::default()
        };
        let merged = merge_prechecks(
            Some(agent),
            vec![ValidationIssue::new(IssueKind::NoCitations, Severity::High, "precheck")],
        );
        assert_eq!(merged.issues.len(), 1);
        assert_eq!(merged.issues[0].description, "agent");
    }

    #[test]
    fn test_merge_without_agent_result() {
        assert!(merge_prechecks(None, vec![]).passed);
        let low = ValidationIssue::new(IssueKind::InsufficientCitations, Severity::Low, "x");
        assert!(merge_prechecks(None, vec![low]).passed);
    }
}
