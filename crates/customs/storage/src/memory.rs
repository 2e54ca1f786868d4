//! In-memory storage adapter.
//!
//! Deterministic and test-friendly; state is lost on restart.

use crate::model::JobRecord;
use crate::traits::{CheckpointStore, JobStore, QueryWindow};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use customs_types::{ConversationState, JobId};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryCustomsStorage {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
    checkpoints: RwLock<HashMap<JobId, ConversationState>>,
}

impl InMemoryCustomsStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryCustomsStorage {
    async fn create_job(&self, job: JobRecord) -> StorageResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.job_id) {
            return Err(StorageError::Conflict(format!(
                "job {} already exists",
                job.job_id
            )));
        }
        jobs.insert(job.job_id.clone(), job);
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> StorageResult<Option<JobRecord>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn request_abort(&self, job_id: &JobId) -> StorageResult<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| StorageError::NotFound(format!("job {job_id}")))?;
        job.abort_requested = true;
        Ok(())
    }

    async fn list_jobs(&self, window: QueryWindow) -> StorageResult<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.job_id.cmp(&b.job_id))
        });
        let iter = jobs.into_iter().skip(window.offset);
        Ok(if window.limit == 0 {
            iter.collect()
        } else {
            iter.take(window.limit).collect()
        })
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCustomsStorage {
    async fn save_checkpoint(&self, state: &ConversationState) -> StorageResult<()> {
        if !self.jobs.read().await.contains_key(&state.job_id) {
            return Err(StorageError::NotFound(format!("job {}", state.job_id)));
        }

        let mut checkpoints = self.checkpoints.write().await;
        if let Some(existing) = checkpoints.get(&state.job_id) {
            if existing.is_terminal() {
                return Err(StorageError::Conflict(format!(
                    "job {} is already {}",
                    state.job_id, existing.status
                )));
            }
        }
        checkpoints.insert(state.job_id.clone(), state.clone());
        Ok(())
    }

    async fn load_checkpoint(&self, job_id: &JobId) -> StorageResult<Option<ConversationState>> {
        Ok(self.checkpoints.read().await.get(job_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> JobId {
        JobId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_job() {
        let store = InMemoryCustomsStorage::new();
        store
            .create_job(JobRecord::new(id("a"), "ceramic mug").with_destination("DE"))
            .await
            .unwrap();

        let job = store.get_job(&id("a")).await.unwrap().unwrap();
        assert_eq!(job.description, "ceramic mug");
        assert_eq!(job.destination_country.as_deref(), Some("DE"));
        assert!(store.get_job(&id("b")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_job_conflicts() {
        let store = InMemoryCustomsStorage::new();
        store.create_job(JobRecord::new(id("a"), "x")).await.unwrap();
        let err = store.create_job(JobRecord::new(id("a"), "y")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_abort_flag() {
        let store = InMemoryCustomsStorage::new();
        store.create_job(JobRecord::new(id("a"), "x")).await.unwrap();
        store.request_abort(&id("a")).await.unwrap();
        assert!(store.get_job(&id("a")).await.unwrap().unwrap().abort_requested);
        assert!(matches!(
            store.request_abort(&id("missing")).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_checkpoint_requires_job() {
        let store = InMemoryCustomsStorage::new();
        let state = ConversationState::new(id("ghost"));
        assert!(matches!(
            store.save_checkpoint(&state).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_checkpoint_upsert_and_terminal_guard() {
        let store = InMemoryCustomsStorage::new();
        store.create_job(JobRecord::new(id("a"), "x")).await.unwrap();

        let state = ConversationState::new(id("a")).start().unwrap();
        store.save_checkpoint(&state).await.unwrap();
        let done = state.complete("finalized", vec![]);
        store.save_checkpoint(&done).await.unwrap();

        let loaded = store.load_checkpoint(&id("a")).await.unwrap().unwrap();
        assert!(loaded.is_terminal());

        let mut reopened = done.clone();
        reopened.status = customs_types::JobStatus::InProgress;
        assert!(matches!(
            store.save_checkpoint(&reopened).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_jobs_window() {
        let store = InMemoryCustomsStorage::new();
        for name in ["a", "b", "c"] {
            store.create_job(JobRecord::new(id(name), name)).await.unwrap();
        }
        let all = store.list_jobs(QueryWindow::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        let page = store
            .list_jobs(QueryWindow { limit: 2, offset: 1 })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }
}
