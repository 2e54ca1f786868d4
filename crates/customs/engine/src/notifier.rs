//! Notifications for jobs that stop running

use async_trait::async_trait;
use customs_types::{EscalationSummary, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Completed {
        job_id: JobId,
        confidence: u8,
        hs_code: Option<String>,
    },
    Escalated {
        job_id: JobId,
        summary: EscalationSummary,
    },
    WaitingForUser {
        job_id: JobId,
        questions: Vec<String>,
    },
    Failed {
        job_id: JobId,
        reason: String,
    },
}

/// Delivery is best effort; a notifier cannot fail a job.
#[async_trait]
pub trait JobNotifier: Send + Sync {
    async fn notify(&self, event: &JobEvent);
}

/// Notifier that only emits log events.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl JobNotifier for TracingNotifier {
    async fn notify(&self, event: &JobEvent) {
        match event {
            JobEvent::Completed {
                job_id,
                confidence,
                hs_code,
            } => tracing::info!(
                job_id = %job_id,
                confidence,
                hs_code = hs_code.as_deref().unwrap_or("-"),
                "classification completed"
            ),
            JobEvent::Escalated { job_id, summary } => tracing::warn!(
                job_id = %job_id,
                reason = %summary.reason,
                issues = summary.outstanding_issues.len(),
                "classification escalated for human review"
            ),
            JobEvent::WaitingForUser { job_id, questions } => tracing::info!(
                job_id = %job_id,
                questions = questions.len(),
                "waiting for user input"
            ),
            JobEvent::Failed { job_id, reason } => {
                tracing::error!(job_id = %job_id, reason = %reason, "classification failed")
            }
        }
    }
}
