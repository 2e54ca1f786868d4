//! Normalization of heterogeneous agent responses
//!
//! Agents answer with `{ "status": ..., ...payload }`. The payload may be
//! flat or nested under `data`, and the same fact arrives under a few
//! different names and shapes. Everything is mapped onto the fixed fact keys
//! here; fields nobody tracks stay in each fact's passthrough map.

use customs_engine::{AgentError, AgentOutcome};
use customs_types::{
    ActionKind, CandidateHeading, CandidateHeadings, ClassificationDecision, ComplianceData, Facts,
    LegalResearch, PrecedentCase, Precedents, ProductProfile, TaxData, ValidationResult,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub fn normalize_response(kind: ActionKind, body: Value) -> Result<AgentOutcome, AgentError> {
    let Value::Object(body) = body else {
        return Err(AgentError::Malformed("response is not a JSON object".into()));
    };

    let status = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("success")
        .to_ascii_lowercase();
    let summary = body
        .get("summary")
        .and_then(Value::as_str)
        .map(str::to_string);

    match status.as_str() {
        "success" | "ok" | "completed" => {}
        "waiting_for_user" | "needs_input" | "insufficient_input" => {
            return Ok(needs_input(&body, summary));
        }
        "error" | "failed" => {
            let message = ["error", "message"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .unwrap_or("unspecified agent error");
            return Err(AgentError::Reported(message.to_string()));
        }
        other => {
            return Err(AgentError::Malformed(format!("unknown status '{other}'")));
        }
    }

    let payload = match body.get("data") {
        Some(Value::Object(data)) => data.clone(),
        _ => body.clone(),
    };

    if matches!(kind, ActionKind::AnalyzeProduct | ActionKind::RefineProduct)
        && payload
            .get("insufficientInput")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    {
        return Ok(needs_input(&payload, summary));
    }

    let update = match kind {
        ActionKind::AnalyzeProduct | ActionKind::RefineProduct => product(&payload)?,
        ActionKind::FetchLegalSources => research(&payload)?,
        ActionKind::SearchPrecedents => Facts {
            precedents: Some(precedents(&payload)?.unwrap_or_default()),
            ..Default::default()
        },
        ActionKind::Classify => Facts {
            decision: Some(decision(&payload)?),
            ..Default::default()
        },
        ActionKind::Validate => Facts {
            validation_result: first(&payload, &["validationResult", "validation"])
                .map(validation)
                .transpose()?,
            ..Default::default()
        },
        ActionKind::CalculateTax => Facts {
            tax_data: Some(parse_or_payload::<TaxData>(&payload, "taxData")?),
            ..Default::default()
        },
        ActionKind::CheckCompliance => Facts {
            compliance_data: Some(parse_or_payload::<ComplianceData>(&payload, "complianceData")?),
            ..Default::default()
        },
        ActionKind::RequestUserInput | ActionKind::Finalize | ActionKind::Escalate => {
            return Err(AgentError::Unsupported(kind));
        }
    };

    let summary = summary.unwrap_or_else(|| {
        let keys: Vec<String> = update
            .present_keys()
            .iter()
            .map(|k| format!("{k:?}"))
            .collect();
        format!("{kind} updated [{}]", keys.join(", "))
    });
    Ok(AgentOutcome::Facts { update, summary })
}

fn needs_input(body: &Map<String, Value>, summary: Option<String>) -> AgentOutcome {
    let mut questions: Vec<String> = match body.get("questions") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|q| match q {
                Value::String(s) => Some(s.clone()),
                other => other.get("question").and_then(Value::as_str).map(str::to_string),
            })
            .collect(),
        _ => Vec::new(),
    };
    if let Some(single) = body.get("question").and_then(Value::as_str) {
        questions.push(single.to_string());
    }
    questions.retain(|q| !q.trim().is_empty());

    AgentOutcome::NeedsInput {
        questions,
        summary: summary.unwrap_or_else(|| "agent needs more input".to_string()),
    }
}

// ── Per-Stage Mapping ────────────────────────────────────────────────

fn product(payload: &Map<String, Value>) -> Result<Facts, AgentError> {
    let profile = first(payload, &["productProfile", "profile", "product"])
        .map(|v| parse::<ProductProfile>(v, "productProfile"))
        .transpose()?
        .ok_or_else(|| AgentError::Malformed("product analysis returned no profile".into()))?;

    let readiness = first(payload, &["productReadiness", "readiness"])
        .map(readiness_score)
        .unwrap_or(0);

    Ok(Facts {
        product_profile: Some(profile),
        product_readiness: Some(readiness),
        ..Default::default()
    })
}

/// Scores arrive as 0-100 or as a 0-1 fraction.
fn readiness_score(value: &Value) -> u8 {
    let Some(n) = value.as_f64() else {
        return 0;
    };
    let scaled = if value.is_f64() && n <= 1.0 { n * 100.0 } else { n };
    scaled.clamp(0.0, 100.0).round() as u8
}

fn validation(value: &Value) -> Result<ValidationResult, AgentError> {
    let mut result: ValidationResult = parse(value, "validationResult")?;
    result.score = value
        .get("score")
        .filter(|s| !s.is_null())
        .map(|s| f64::from(readiness_score(s)));
    Ok(result)
}

fn research(payload: &Map<String, Value>) -> Result<Facts, AgentError> {
    let headings = match first(payload, &["candidateHeadings", "headings"]) {
        None => CandidateHeadings::default(),
        Some(Value::Array(items)) => CandidateHeadings {
            headings: items.iter().map(heading).collect::<Result<_, _>>()?,
            ..Default::default()
        },
        Some(other) => parse(other, "candidateHeadings")?,
    };

    let legal = first(payload, &["legalResearch", "research"])
        .map(|v| parse::<LegalResearch>(v, "legalResearch"))
        .transpose()?
        .unwrap_or_default();

    Ok(Facts {
        candidate_headings: Some(headings),
        legal_research: Some(legal),
        precedents: precedents(payload)?,
        ..Default::default()
    })
}

fn heading(item: &Value) -> Result<CandidateHeading, AgentError> {
    match item {
        Value::String(code) => Ok(CandidateHeading {
            code: code.clone(),
            ..Default::default()
        }),
        other => parse(other, "candidateHeadings[]"),
    }
}

fn precedents(payload: &Map<String, Value>) -> Result<Option<Precedents>, AgentError> {
    match first(payload, &["precedents", "cases"]) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(Precedents {
            cases: items
                .iter()
                .map(|c| parse::<PrecedentCase>(c, "precedents[]"))
                .collect::<Result<_, _>>()?,
            ..Default::default()
        })),
        Some(other) => parse(other, "precedents").map(Some),
    }
}

fn decision(payload: &Map<String, Value>) -> Result<ClassificationDecision, AgentError> {
    let value = first(payload, &["decision", "classification"])
        .cloned()
        .unwrap_or_else(|| Value::Object(payload.clone()));
    let decision: ClassificationDecision = parse(&value, "decision")?;
    if decision.hs_code.trim().is_empty() {
        return Err(AgentError::Malformed("decision has an empty hsCode".into()));
    }
    Ok(decision)
}

// ── Helpers ──────────────────────────────────────────────────────────

fn first<'a>(payload: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| payload.get(*k))
        .find(|v| !v.is_null())
}

fn parse<T: DeserializeOwned>(value: &Value, field: &str) -> Result<T, AgentError> {
    serde_json::from_value(value.clone())
        .map_err(|e| AgentError::Malformed(format!("{field}: {e}")))
}

/// Parse `key` if present, else treat the whole payload (minus the
/// envelope fields) as the fact.
fn parse_or_payload<T: DeserializeOwned>(
    payload: &Map<String, Value>,
    key: &str,
) -> Result<T, AgentError> {
    match payload.get(key) {
        Some(value) if !value.is_null() => parse(value, key),
        _ => {
            let mut rest = payload.clone();
            rest.remove("status");
            rest.remove("summary");
            parse(&Value::Object(rest), key)
        }
    }
}
