//! End-to-end runs of the orchestrator against a scripted agent.

use async_trait::async_trait;
use customs_engine::*;
use customs_storage::{InMemoryCustomsStorage, JobRecord};
use customs_types::*;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

// ── Test Doubles ─────────────────────────────────────────────────────

type Scripted = Result<AgentOutcome, AgentError>;

#[derive(Default)]
struct ScriptedInvoker {
    scripts: Mutex<HashMap<ActionKind, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(Action, JobContext)>>,
}

impl ScriptedInvoker {
    fn push(&self, kind: ActionKind, outcome: Scripted) {
        self.scripts
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(outcome);
    }

    fn calls(&self) -> Vec<(Action, JobContext)> {
        self.calls.lock().unwrap().clone()
    }

    fn kinds(&self) -> Vec<ActionKind> {
        self.calls().into_iter().map(|(a, _)| a.kind).collect()
    }
}

#[async_trait]
impl AgentInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        action: &Action,
        context: &JobContext,
        _facts: &Facts,
    ) -> Result<AgentOutcome, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.clone(), context.clone()));
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&action.kind)
            .and_then(|q| q.pop_front());
        scripted.unwrap_or_else(|| Ok(default_outcome(action.kind)))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<JobEvent>>,
}

#[async_trait]
impl JobNotifier for RecordingNotifier {
    async fn notify(&self, event: &JobEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Canned Agent Output ──────────────────────────────────────────────

fn facts_outcome(update: Facts) -> AgentOutcome {
    AgentOutcome::Facts {
        update,
        summary: "ok".to_string(),
    }
}

fn product_facts() -> Facts {
    Facts {
        product_profile: Some(ProductProfile {
            name: Some("Leather ankle boot".into()),
            function: Some("footwear".into()),
            essential_character: Some("leather upper".into()),
            ..Default::default()
        }),
        product_readiness: Some(90),
        ..Default::default()
    }
}

fn research_facts() -> Facts {
    Facts {
        candidate_headings: Some(CandidateHeadings {
            headings: vec![CandidateHeading {
                code: "6403".into(),
                ..Default::default()
            }],
            ..Default::default()
        }),
        legal_research: Some(LegalResearch {
            reference_text: "Heading 6403: footwear with uppers of leather. ".repeat(30),
            documents: vec![json!({"id": "chapter-64-notes"})],
            sources: vec![LegalSource {
                title: "HS Nomenclature".into(),
                tier: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn decision_facts() -> Facts {
    Facts {
        decision: Some(ClassificationDecision {
            hs_code: "6403.91.00".into(),
            rule: Some("GRI 1".into()),
            citations: Some(vec![
                Citation {
                    source: "Heading 6403".into(),
                    ..Default::default()
                },
                Citation {
                    source: "Chapter 64 Note 4".into(),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn validation(passed: bool, issues: Vec<ValidationIssue>) -> Facts {
    Facts {
        validation_result: Some(ValidationResult {
            passed,
            score: passed.then_some(92.0),
            issues,
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn no_citations() -> ValidationIssue {
    ValidationIssue::new(IssueKind::NoCitations, Severity::High, "no legal source cited")
}

fn default_outcome(kind: ActionKind) -> AgentOutcome {
    facts_outcome(match kind {
        ActionKind::AnalyzeProduct | ActionKind::RefineProduct => product_facts(),
        ActionKind::FetchLegalSources => research_facts(),
        ActionKind::SearchPrecedents => Facts {
            precedents: Some(Precedents {
                cases: vec![PrecedentCase {
                    reference: "BTI DE-2021-1".into(),
                    hs_code: Some("6403.91".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        },
        ActionKind::Classify => decision_facts(),
        ActionKind::Validate => validation(true, vec![]),
        ActionKind::CalculateTax => Facts {
            tax_data: Some(TaxData {
                duty_rate: Some(8.0),
                ..Default::default()
            }),
            ..Default::default()
        },
        ActionKind::CheckCompliance => Facts {
            compliance_data: Some(ComplianceData::default()),
            ..Default::default()
        },
        _ => Facts::default(),
    })
}

// ── Harness ──────────────────────────────────────────────────────────

struct Harness {
    orchestrator: ConversationOrchestrator,
    invoker: Arc<ScriptedInvoker>,
    notifier: Arc<RecordingNotifier>,
    job_id: JobId,
}

async fn harness(configure: impl FnOnce(ConversationOrchestrator) -> ConversationOrchestrator) -> Harness {
    let storage = Arc::new(InMemoryCustomsStorage::new());
    let invoker = Arc::new(ScriptedInvoker::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let orchestrator = configure(
        ConversationOrchestrator::new(storage, invoker.clone()).with_notifier(notifier.clone()),
    );
    let job_id = JobId::parse("job-boot-1").unwrap();
    orchestrator
        .create_job(
            JobRecord::new(job_id.clone(), "Men's ankle boot, leather upper, rubber sole")
                .with_destination("DE"),
        )
        .await
        .unwrap();
    Harness {
        orchestrator,
        invoker,
        notifier,
        job_id,
    }
}

// ── Scenarios ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_happy_path_completes() {
    let h = harness(|o| o).await;
    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();

    match outcome {
        RunOutcome::Completed {
            confidence,
            hs_code,
            ..
        } => {
            assert_eq!(confidence, 88);
            assert_eq!(hs_code.as_deref(), Some("6403.91.00"));
        }
        other => panic!("expected completion, got {other:?}"),
    }

    assert_eq!(
        h.invoker.kinds(),
        vec![
            ActionKind::AnalyzeProduct,
            ActionKind::FetchLegalSources,
            ActionKind::SearchPrecedents,
            ActionKind::Classify,
            ActionKind::Validate,
            ActionKind::CalculateTax,
            ActionKind::CheckCompliance,
        ]
    );

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.status, JobStatus::Completed);
    assert_eq!(state.current_round, 7);
    assert_eq!(state.rounds.len(), 7);
    assert_eq!(state.confidence_trajectory.len(), 7);
    assert!(state.rounds.iter().all(|r| r.succeeded()));
    assert_eq!(state.rounds[0].input_params["context"]["destinationCountry"], "DE");

    let events = h.notifier.events.lock().unwrap();
    assert!(matches!(events.as_slice(), [JobEvent::Completed { confidence: 88, .. }]));
}

#[tokio::test]
async fn test_citation_failure_self_heals() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::Validate,
        Ok(facts_outcome(validation(false, vec![no_citations()]))),
    );

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let calls = h.invoker.calls();
    let classify: Vec<&Action> = calls
        .iter()
        .map(|(a, _)| a)
        .filter(|a| a.kind == ActionKind::Classify)
        .collect();
    assert_eq!(classify.len(), 2);
    assert!(!classify[0].self_healing);
    assert!(classify[1].self_healing);
    assert!(classify[1].request().enforce_citations);

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.self_healing_attempts, 1);
    assert_eq!(state.rounds.iter().filter(|r| r.self_healing).count(), 1);
}

#[tokio::test]
async fn test_self_healing_cap_escalates() {
    let h = harness(|o| o).await;
    for _ in 0..4 {
        h.invoker.push(
            ActionKind::Validate,
            Ok(facts_outcome(validation(false, vec![no_citations()]))),
        );
    }

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    let RunOutcome::Escalated { reason, summary } = outcome else {
        panic!("expected escalation");
    };
    assert_eq!(reason, "self-healing exhausted");
    assert_eq!(summary.best_guess.unwrap().hs_code, "6403.91.00");
    assert_eq!(summary.outstanding_issues[0].kind, IssueKind::NoCitations);
    assert!(summary.recent_rounds.len() <= 5);

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.status, JobStatus::Escalated);
    assert_eq!(state.self_healing_attempts, 3);
    assert_eq!(state.current_round, 10);
    assert!(state.escalation.is_some());
}

#[tokio::test]
async fn test_reclassification_recomputes_tax() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::Validate,
        Ok(facts_outcome(validation(
            false,
            vec![ValidationIssue::new(
                IssueKind::TaxExtraction,
                Severity::High,
                "duty rate unreadable",
            )],
        ))),
    );
    h.invoker.push(
        ActionKind::Validate,
        Ok(facts_outcome(validation(false, vec![no_citations()]))),
    );
    h.invoker
        .push(ActionKind::Classify, Ok(facts_outcome(decision_facts())));
    let mut textile = decision_facts();
    if let Some(decision) = textile.decision.as_mut() {
        decision.hs_code = "6404.19.00".into();
    }
    h.invoker.push(ActionKind::Classify, Ok(facts_outcome(textile)));
    for rate in [8.0, 3.7] {
        h.invoker.push(
            ActionKind::CalculateTax,
            Ok(facts_outcome(Facts {
                tax_data: Some(TaxData {
                    duty_rate: Some(rate),
                    ..Default::default()
                }),
                ..Default::default()
            })),
        );
    }

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    match outcome {
        RunOutcome::Completed { hs_code, .. } => {
            assert_eq!(hs_code.as_deref(), Some("6404.19.00"));
        }
        other => panic!("expected completion, got {other:?}"),
    }

    let kinds = h.invoker.kinds();
    assert_eq!(
        &kinds[4..],
        &[
            ActionKind::Validate,
            ActionKind::CalculateTax,
            ActionKind::Validate,
            ActionKind::Classify,
            ActionKind::Validate,
            ActionKind::CalculateTax,
            ActionKind::CheckCompliance,
        ][..]
    );

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.self_healing_attempts, 2);
    assert_eq!(
        state.current_state.tax_data.and_then(|t| t.duty_rate),
        Some(3.7)
    );
}

#[tokio::test]
async fn test_answer_rejected_while_running() {
    let h = harness(|o| o).await;
    let store = h.orchestrator.store();
    let running = store
        .create_initial(h.job_id.clone())
        .start()
        .unwrap()
        .merge_facts(product_facts().merge(research_facts()).merge(decision_facts()))
        .unwrap();
    store.persist(&running).await.unwrap();

    let err = h
        .orchestrator
        .record_answer(&h.job_id, "Actually it is a sandal")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Domain(CustomsError::InvalidTransition(_))
    ));

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert!(state.user_answers.is_empty());
    assert_eq!(state.current_state.decision, running.current_state.decision);
}

#[tokio::test]
async fn test_max_rounds_escalates() {
    let h = harness(|o| o.with_max_rounds(3)).await;
    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();

    let RunOutcome::Escalated { reason, summary } = outcome else {
        panic!("expected escalation");
    };
    assert_eq!(reason, "max rounds reached");
    assert_eq!(summary.recent_rounds.len(), 3);
    assert_eq!(h.invoker.calls().len(), 3);
}

#[tokio::test]
async fn test_agent_needs_input_then_resumes_with_answer() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::AnalyzeProduct,
        Ok(AgentOutcome::NeedsInput {
            questions: vec!["What is the upper made of?".into()],
            summary: "insufficient input".into(),
        }),
    );

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::WaitingForUser {
            questions: vec!["What is the upper made of?".into()]
        }
    );
    let waiting = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(waiting.status, JobStatus::WaitingForUser);
    assert_eq!(waiting.current_round, 1);

    let answered = h
        .orchestrator
        .record_answer(&h.job_id, "Full-grain cow leather")
        .await
        .unwrap();
    assert_eq!(answered.status, JobStatus::InProgress);

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));

    let calls = h.invoker.calls();
    assert_eq!(calls[1].0.kind, ActionKind::AnalyzeProduct);
    assert_eq!(calls[1].1.user_answers.len(), 1);
    assert_eq!(calls[1].1.user_answers[0].answer, "Full-grain cow leather");
}

#[tokio::test]
async fn test_missing_critical_fields_ask_user() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::AnalyzeProduct,
        Ok(facts_outcome(Facts {
            product_profile: Some(ProductProfile {
                name: Some("Boot".into()),
                ..Default::default()
            }),
            product_readiness: Some(40),
            ..Default::default()
        })),
    );

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    let RunOutcome::WaitingForUser { questions } = outcome else {
        panic!("expected a question");
    };
    assert_eq!(questions.len(), 1);
    assert!(questions[0].contains("function"));
}

#[tokio::test]
async fn test_agent_error_fails_job() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::FetchLegalSources,
        Err(AgentError::Transport("connection refused".into())),
    );

    let err = h.orchestrator.run(&h.job_id, None).await.unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Agent {
            action: ActionKind::FetchLegalSources,
            ..
        }
    ));

    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.status, JobStatus::Failed);
    assert_eq!(state.rounds.len(), 2);
    assert!(state.rounds[1].outcome.is_error());

    // terminal: a second run reports the failure without touching anything
    let again = h.orchestrator.run(&h.job_id, None).await.unwrap();
    let RunOutcome::Failed { reason } = again else {
        panic!("expected failure");
    };
    assert!(reason.contains("FETCH_LEGAL_SOURCES"));
    assert_eq!(h.invoker.calls().len(), 2);
    let after = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(after, state);
}

#[tokio::test]
async fn test_completed_job_is_not_rerun() {
    let h = harness(|o| o).await;
    let first = h.orchestrator.run(&h.job_id, None).await.unwrap();
    let calls = h.invoker.calls().len();

    let second = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(h.invoker.calls().len(), calls);
    assert!(h.orchestrator.record_answer(&h.job_id, "late").await.is_err());
}

#[tokio::test]
async fn test_abort_before_run() {
    let h = harness(|o| o).await;
    h.orchestrator.request_abort(&h.job_id).await.unwrap();

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Failed {
            reason: "aborted by operator".into()
        }
    );
    assert!(h.invoker.calls().is_empty());
}

#[tokio::test]
async fn test_resume_picks_same_action() {
    let h = harness(|o| o).await;
    let store = h.orchestrator.store();

    let interrupted = store
        .create_initial(h.job_id.clone())
        .start()
        .unwrap()
        .merge_facts(product_facts().merge(research_facts()))
        .unwrap();
    store.persist(&interrupted).await.unwrap();

    let (_, loaded) = store.load(&h.job_id).await.unwrap();
    let loaded = match loaded {
        LoadOutcome::Resume(state) => state,
        other => panic!("expected resume, got {other:?}"),
    };
    assert_eq!(loaded, interrupted);
    let expected = decide_next_action(&loaded, compute_confidence(&loaded.current_state));

    h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert_eq!(h.invoker.kinds()[0], expected.kind);
    assert_eq!(expected.kind, ActionKind::SearchPrecedents);
}

#[tokio::test]
async fn test_intended_use_reaches_agents() {
    let h = harness(|o| o).await;
    h.orchestrator
        .run(&h.job_id, Some("retail sale".into()))
        .await
        .unwrap();
    let calls = h.invoker.calls();
    assert_eq!(calls[0].1.intended_use.as_deref(), Some("retail sale"));
}

#[tokio::test]
async fn test_unknown_job_rejected() {
    let h = harness(|o| o).await;
    let missing = JobId::parse("does-not-exist").unwrap();
    assert!(matches!(
        h.orchestrator.run(&missing, None).await,
        Err(OrchestratorError::JobNotFound(_))
    ));
    assert!(h.invoker.calls().is_empty());
}

#[tokio::test]
async fn test_precheck_failure_triggers_healing() {
    let h = harness(|o| o).await;
    h.invoker.push(
        ActionKind::Classify,
        Ok(facts_outcome(Facts {
            decision: Some(ClassificationDecision {
                hs_code: "6403.91.00".into(),
                rule: Some("GRI 1".into()),
                citations: Some(vec![]),
                ..Default::default()
            }),
            ..Default::default()
        })),
    );

    let outcome = h.orchestrator.run(&h.job_id, None).await.unwrap();
    assert!(matches!(outcome, RunOutcome::Completed { .. }));
    let state = h.orchestrator.job_state(&h.job_id).await.unwrap();
    assert_eq!(state.self_healing_attempts, 1);
}
