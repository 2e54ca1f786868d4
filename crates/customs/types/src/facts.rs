//! Facts: the intermediate results a job accumulates
//!
//! Only the fields the confidence model, the decision table and the
//! pre-checks read are typed. Everything else an agent returns is kept in
//! the `extra` map of the enclosing fact and passed through unchanged.

use crate::ValidationIssue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Untyped passthrough fields of a fact
pub type Extra = Map<String, Value>;

// ── Fact Keys ────────────────────────────────────────────────────────

/// Names of the individually clearable facts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FactKey {
    ProductProfile,
    ProductReadiness,
    CandidateHeadings,
    LegalResearch,
    Precedents,
    Decision,
    ValidationResult,
    TaxData,
    ComplianceData,
}

impl FactKey {
    pub const ALL: [FactKey; 9] = [
        FactKey::ProductProfile,
        FactKey::ProductReadiness,
        FactKey::CandidateHeadings,
        FactKey::LegalResearch,
        FactKey::Precedents,
        FactKey::Decision,
        FactKey::ValidationResult,
        FactKey::TaxData,
        FactKey::ComplianceData,
    ];
}

// ── Product ──────────────────────────────────────────────────────────

/// Structured description of the goods being classified
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential_character: Option<String>,
    /// Composite-goods breakdown; empty for single-material goods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ProductProfile {
    /// Fields without which the product cannot be classified at all
    pub fn missing_critical_fields(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name");
        }
        if blank(&self.function) {
            missing.push("function");
        }
        missing
    }

    pub fn has_essential_character(&self) -> bool {
        self.essential_character
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

/// One part of a composite product
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Share of value or weight, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Research ─────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateHeadings {
    #[serde(default)]
    pub headings: Vec<CandidateHeading>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateHeading {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Legal texts retrieved for the product
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalResearch {
    /// Concatenated reference text handed to the classifier
    #[serde(default)]
    pub reference_text: String,
    #[serde(default)]
    pub documents: Vec<Value>,
    #[serde(default)]
    pub sources: Vec<LegalSource>,
    /// Questions the research could not answer
    #[serde(default)]
    pub context_gaps: Vec<String>,
    /// Externally computed retrieval quality, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieval_quality: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl LegalResearch {
    pub fn has_top_tier_source(&self) -> bool {
        self.sources.iter().any(|s| s.tier == Some(1))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalSource {
    pub title: String,
    /// 1 = binding legal text, higher numbers are weaker authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precedents {
    #[serde(default)]
    pub cases: Vec<PrecedentCase>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Precedents {
    pub fn has_conflict(&self) -> bool {
        self.cases.iter().any(|c| c.conflicting)
    }
}

/// A prior ruling on similar goods
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrecedentCase {
    #[serde(default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hs_code: Option<String>,
    /// Ruling points to a different heading than the current candidates
    #[serde(default)]
    pub conflicting: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Decision & Validation ────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationDecision {
    pub hs_code: String,
    /// GRI rule the classification relies on, e.g. "GRI 3(b)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// `None` when citations were never evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential_character_breakdown: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty_rate: Option<f64>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceData {
    #[serde(default)]
    pub requirements: Vec<Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ── Facts ────────────────────────────────────────────────────────────

/// All facts of a job; also used as a partial update where present
/// fields overwrite and absent fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facts {
    #[serde(default)]
    pub product_profile: Option<ProductProfile>,
    /// 0-100 completeness of the product profile
    #[serde(default)]
    pub product_readiness: Option<u8>,
    #[serde(default)]
    pub candidate_headings: Option<CandidateHeadings>,
    #[serde(default)]
    pub legal_research: Option<LegalResearch>,
    #[serde(default)]
    pub precedents: Option<Precedents>,
    #[serde(default)]
    pub decision: Option<ClassificationDecision>,
    #[serde(default)]
    pub validation_result: Option<ValidationResult>,
    #[serde(default)]
    pub tax_data: Option<TaxData>,
    #[serde(default)]
    pub compliance_data: Option<ComplianceData>,
}

impl Facts {
    pub fn is_empty(&self) -> bool {
        FactKey::ALL.iter().all(|k| !self.is_present(*k))
    }

    pub fn is_present(&self, key: FactKey) -> bool {
        match key {
            FactKey::ProductProfile => self.product_profile.is_some(),
            FactKey::ProductReadiness => self.product_readiness.is_some(),
            FactKey::CandidateHeadings => self.candidate_headings.is_some(),
            FactKey::LegalResearch => self.legal_research.is_some(),
            FactKey::Precedents => self.precedents.is_some(),
            FactKey::Decision => self.decision.is_some(),
            FactKey::ValidationResult => self.validation_result.is_some(),
            FactKey::TaxData => self.tax_data.is_some(),
            FactKey::ComplianceData => self.compliance_data.is_some(),
        }
    }

    /// Keys present in this value, in canonical order
    pub fn present_keys(&self) -> Vec<FactKey> {
        FactKey::ALL
            .into_iter()
            .filter(|k| self.is_present(*k))
            .collect()
    }

    /// Shallow merge: every fact present in `update` replaces ours.
    pub fn merge(mut self, update: Facts) -> Self {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if update.$field.is_some() {
                    self.$field = update.$field;
                })*
            };
        }
        take!(
            product_profile,
            product_readiness,
            candidate_headings,
            legal_research,
            precedents,
            decision,
            validation_result,
            tax_data,
            compliance_data
        );
        self
    }

    pub fn clear(mut self, keys: &[FactKey]) -> Self {
        for key in keys {
            match key {
                FactKey::ProductProfile => self.product_profile = None,
                FactKey::ProductReadiness => self.product_readiness = None,
                FactKey::CandidateHeadings => self.candidate_headings = None,
                FactKey::LegalResearch => self.legal_research = None,
                FactKey::Precedents => self.precedents = None,
                FactKey::Decision => self.decision = None,
                FactKey::ValidationResult => self.validation_result = None,
                FactKey::TaxData => self.tax_data = None,
                FactKey::ComplianceData => self.compliance_data = None,
            }
        }
        self
    }
}
