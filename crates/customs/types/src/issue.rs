//! Validation issues reported by the quality checks

use serde::{Deserialize, Serialize};

/// Closed set of validation failure categories.
///
/// Unrecognized categories deserialize to [`IssueKind::Unknown`] and are
/// routed to the generic re-classification branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NoCitations,
    InsufficientCitations,
    CitationFormat,
    MissingLegalContext,
    InsufficientResearch,
    TaxExtraction,
    ComplianceExtraction,
    HierarchyViolation,
    InvalidHsCode,
    EssentialCharacter,
    CompositeInconsistency,
    #[serde(other)]
    Unknown,
}

impl IssueKind {
    pub fn is_citation(&self) -> bool {
        matches!(
            self,
            Self::NoCitations | Self::InsufficientCitations | Self::CitationFormat
        )
    }

    pub fn is_research(&self) -> bool {
        matches!(self, Self::MissingLegalContext | Self::InsufficientResearch)
    }

    pub fn is_product(&self) -> bool {
        matches!(self, Self::EssentialCharacter | Self::CompositeInconsistency)
    }
}

/// Severity of a validation issue, ordered from least to most severe
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical issues fail validation on their own
    pub fn is_blocking(&self) -> bool {
        *self >= Severity::High
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
        }
    }
}
