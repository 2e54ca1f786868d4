//! PostgreSQL adapter for job and checkpoint storage.
//!
//! Each checkpoint is stored as one JSONB document keyed by job id. Status
//! and round count are duplicated into columns for operational queries.

use crate::model::JobRecord;
use crate::traits::{CheckpointStore, JobStore, QueryWindow};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use customs_types::{ConversationState, JobId};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

#[derive(Clone)]
pub struct PostgresCustomsStorage {
    pool: PgPool,
}

impl PostgresCustomsStorage {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect postgres: {e}")))?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub async fn from_pool(pool: PgPool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS customs_jobs (
                job_id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                destination_country TEXT NULL,
                intended_use TEXT NULL,
                abort_requested BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS customs_checkpoints (
                job_id TEXT PRIMARY KEY REFERENCES customs_jobs(job_id),
                status TEXT NOT NULL,
                current_round INTEGER NOT NULL,
                state JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_customs_checkpoints_status
                ON customs_checkpoints(status)
            "#,
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for PostgresCustomsStorage {
    async fn create_job(&self, job: JobRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO customs_jobs
                (job_id, description, destination_country, intended_use, abort_requested, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.job_id.as_str())
        .bind(&job.description)
        .bind(&job.destination_country)
        .bind(&job.intended_use)
        .bind(job.abort_requested)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> StorageResult<Option<JobRecord>> {
        let row = sqlx::query(
            r#"
            SELECT job_id, description, destination_country, intended_use, abort_requested, created_at
              FROM customs_jobs
             WHERE job_id = $1
            "#,
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.map(job_row_to_record).transpose()
    }

    async fn request_abort(&self, job_id: &JobId) -> StorageResult<()> {
        let result = sqlx::query("UPDATE customs_jobs SET abort_requested = TRUE WHERE job_id = $1")
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("job {job_id}")));
        }
        Ok(())
    }

    async fn list_jobs(&self, window: QueryWindow) -> StorageResult<Vec<JobRecord>> {
        // LIMIT NULL means no limit in PostgreSQL.
        let limit = if window.limit == 0 {
            None
        } else {
            Some(to_i64(window.limit)?)
        };
        let rows = sqlx::query(
            r#"
            SELECT job_id, description, destination_country, intended_use, abort_requested, created_at
              FROM customs_jobs
             ORDER BY created_at DESC, job_id ASC
             LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(to_i64(window.offset)?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter().map(job_row_to_record).collect()
    }
}

#[async_trait]
impl CheckpointStore for PostgresCustomsStorage {
    async fn save_checkpoint(&self, state: &ConversationState) -> StorageResult<()> {
        let document = serde_json::to_value(state)?;

        let result = sqlx::query(
            r#"
            INSERT INTO customs_checkpoints (job_id, status, current_round, state, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (job_id) DO UPDATE SET
                status = EXCLUDED.status,
                current_round = EXCLUDED.current_round,
                state = EXCLUDED.state,
                updated_at = EXCLUDED.updated_at
            WHERE customs_checkpoints.status NOT IN ('completed', 'failed', 'escalated')
            "#,
        )
        .bind(state.job_id.as_str())
        .bind(state.status.as_str())
        .bind(i32::try_from(state.current_round).map_err(|_| {
            StorageError::InvalidInput("round counter too large".to_string())
        })?)
        .bind(document)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "job {} already has a terminal checkpoint",
                state.job_id
            )));
        }
        Ok(())
    }

    async fn load_checkpoint(&self, job_id: &JobId) -> StorageResult<Option<ConversationState>> {
        let row = sqlx::query("SELECT state FROM customs_checkpoints WHERE job_id = $1")
            .bind(job_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        match row {
            None => Ok(None),
            Some(row) => {
                let document: serde_json::Value = row
                    .try_get("state")
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(Some(serde_json::from_value(document)?))
            }
        }
    }
}

fn job_row_to_record(row: PgRow) -> StorageResult<JobRecord> {
    let raw_id: String = row
        .try_get("job_id")
        .map_err(|e| StorageError::Backend(e.to_string()))?;
    let job_id = JobId::parse(&raw_id)
        .map_err(|e| StorageError::Serialization(format!("stored job id invalid: {e}")))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| StorageError::Backend(e.to_string()))?;

    Ok(JobRecord {
        job_id,
        description: row
            .try_get("description")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        destination_country: row
            .try_get("destination_country")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        intended_use: row
            .try_get("intended_use")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        created_at,
        abort_requested: row
            .try_get("abort_requested")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    })
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StorageError::Conflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        // foreign key violation: checkpoint for an unregistered job
        if db_err.code().as_deref() == Some("23503") {
            return StorageError::NotFound(db_err.message().to_string());
        }
    }
    map_sqlx_conflict(err)
}

fn to_i64(value: usize) -> StorageResult<i64> {
    i64::try_from(value)
        .map_err(|_| StorageError::InvalidInput("window value too large".to_string()))
}
