//! Job handlers

use crate::api::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use customs_engine::RunOutcome;
use customs_storage::{JobRecord, QueryWindow};
use customs_types::{ConversationState, JobId, JobStatus};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 500;

fn parse_job_id(raw: &str) -> ApiResult<JobId> {
    JobId::parse(raw).map_err(ApiError::from)
}

// ── Registry ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    /// Generated when absent
    pub job_id: Option<String>,
    pub description: String,
    pub destination_country: Option<String>,
    pub intended_use: Option<String>,
}

pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let job_id = match request.job_id.as_deref() {
        Some(raw) => parse_job_id(raw)?,
        None => JobId::generate(),
    };
    if request.description.trim().is_empty() {
        return Err(ApiError::BadRequest("description must not be empty".into()));
    }

    let mut job = JobRecord::new(job_id, request.description.trim());
    if let Some(country) = request.destination_country.filter(|c| !c.trim().is_empty()) {
        job = job.with_destination(country);
    }
    if let Some(intended_use) = request.intended_use.filter(|u| !u.trim().is_empty()) {
        job = job.with_intended_use(intended_use);
    }

    state.orchestrator.create_job(job.clone()).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
    pub items: Vec<JobRecord>,
    pub limit: usize,
    pub offset: usize,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<ListJobsResponse>> {
    let window = QueryWindow {
        limit: query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset: query.offset.unwrap_or(0),
    };
    let items = state.orchestrator.store().storage().list_jobs(window).await?;
    Ok(Json(ListJobsResponse {
        items,
        limit: window.limit,
        offset: window.offset,
    }))
}

#[derive(Debug, Serialize)]
pub struct JobView {
    pub job: JobRecord,
    pub state: ConversationState,
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobView>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.orchestrator.store().job(&job_id).await?;
    let conversation = state.orchestrator.job_state(&job_id).await?;
    Ok(Json(JobView {
        job,
        state: conversation,
    }))
}

// ── Orchestration ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OrchestrateRequest {
    #[serde(alias = "jobId")]
    pub job_id: String,
    #[serde(default, alias = "intendedUse")]
    pub intended_use: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrchestrateResponse {
    pub job_id: JobId,
    #[serde(flatten)]
    pub outcome: RunOutcome,
    /// Questions joined into one prompt for simple clients
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// Start or resume a job and run it until it stops.
pub async fn orchestrate(
    State(state): State<AppState>,
    Json(request): Json<OrchestrateRequest>,
) -> ApiResult<Json<OrchestrateResponse>> {
    let job_id = parse_job_id(&request.job_id)?;
    let guard = state
        .claim(&job_id)
        .ok_or_else(|| ApiError::Conflict(format!("job {job_id} is already running")))?;

    // Detached so a dropped connection cannot cut a round in half.
    let orchestrator = state.orchestrator.clone();
    let run_id = job_id.clone();
    let intended_use = request.intended_use.filter(|u| !u.trim().is_empty());
    let outcome = tokio::spawn(async move {
        let _guard = guard;
        orchestrator.run(&run_id, intended_use).await
    })
    .await
    .map_err(|e| ApiError::Internal(format!("run task failed: {e}")))??;

    let question = match &outcome {
        RunOutcome::WaitingForUser { questions } => Some(questions.join("\n")),
        _ => None,
    };
    Ok(Json(OrchestrateResponse {
        job_id,
        outcome,
        question,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub answers_recorded: usize,
}

pub async fn record_answer(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> ApiResult<Json<AnswerResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let _guard = state
        .claim(&job_id)
        .ok_or_else(|| ApiError::Conflict(format!("job {job_id} is running")))?;

    let updated = state
        .orchestrator
        .record_answer(&job_id, &request.answer)
        .await?;
    Ok(Json(AnswerResponse {
        job_id,
        status: updated.status,
        answers_recorded: updated.user_answers.len(),
    }))
}

#[derive(Debug, Serialize)]
pub struct AbortResponse {
    pub job_id: JobId,
    pub abort_requested: bool,
}

/// Flag a job; a running loop stops before its next iteration.
pub async fn abort_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<AbortResponse>)> {
    let job_id = parse_job_id(&job_id)?;
    state.orchestrator.request_abort(&job_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AbortResponse {
            job_id,
            abort_requested: true,
        }),
    ))
}
