//! Bulk/pre-enrichment job queue (spec.md §4.7 "Cache policy ... A job queue
//! table exists for bulk/pre-enrichment but on-demand is the default path").

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use bib_core::model::EntityType;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Claimed,
    Done,
    Failed,
}

impl JobStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "claimed" => Self::Claimed,
            "done" => Self::Done,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: Uuid,
    pub entity_type: EntityType,
    pub entity_value: String,
    pub status: JobStatus,
}

pub struct JobQueue {
    pool: SqlitePool,
}

impl JobQueue {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn enqueue(&self, entity_type: EntityType, entity_value: &str) -> Result<Uuid> {
        let job_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO enrichment_jobs (job_id, entity_type, entity_value, status, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(job_id.to_string())
        .bind(entity_type_str(entity_type))
        .bind(entity_value)
        .bind(JobStatus::Pending.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(job_id)
    }

    /// Atomically claims the oldest pending job, if any, so two background
    /// workers never process the same job twice.
    pub async fn claim_next(&self) -> Result<Option<Job>> {
        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "SELECT job_id, entity_type, entity_value FROM enrichment_jobs \
             WHERE status = ? ORDER BY created_at ASC LIMIT 1",
        )
        .bind(JobStatus::Pending.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let job_id: String = row.get("job_id");
        sqlx::query("UPDATE enrichment_jobs SET status = ?, claimed_at = ? WHERE job_id = ?")
            .bind(JobStatus::Claimed.as_str())
            .bind(Utc::now().to_rfc3339())
            .bind(&job_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Job {
            job_id: job_id.parse().expect("job_id column is always a valid uuid"),
            entity_type: parse_entity_type(&row.get::<String, _>("entity_type")),
            entity_value: row.get("entity_value"),
            status: JobStatus::Claimed,
        }))
    }

    pub async fn mark_done(&self, job_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE enrichment_jobs SET status = 'done', completed_at = ? WHERE job_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(job_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<()> {
        sqlx::query(
            "UPDATE enrichment_jobs SET status = 'failed', completed_at = ?, last_error = ? WHERE job_id = ?",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(error)
        .bind(job_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn entity_type_str(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "person",
        EntityType::Place => "place",
        EntityType::Publisher => "publisher",
        EntityType::Organization => "organization",
    }
}

fn parse_entity_type(s: &str) -> EntityType {
    match s {
        "place" => EntityType::Place,
        "publisher" => EntityType::Publisher,
        "organization" => EntityType::Organization,
        _ => EntityType::Person,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_store::SqliteEnrichmentCacheStore;

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteEnrichmentCacheStore::new(pool.clone()).ensure_schema().await.unwrap();
        pool
    }

    #[tokio::test]
    async fn claim_next_returns_oldest_pending_job_once() {
        let pool = fresh_pool().await;
        let queue = JobQueue::new(pool);
        queue.enqueue(EntityType::Person, "Hugo, Victor").await.unwrap();

        let job = queue.claim_next().await.unwrap().unwrap();
        assert_eq!(job.entity_value, "Hugo, Victor");
        assert_eq!(job.status, JobStatus::Claimed);

        assert!(queue.claim_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_done_is_terminal() {
        let pool = fresh_pool().await;
        let queue = JobQueue::new(pool);
        let id = queue.enqueue(EntityType::Place, "Paris").await.unwrap();
        queue.claim_next().await.unwrap();
        queue.mark_done(id).await.unwrap();
        assert!(queue.claim_next().await.unwrap().is_none());
    }
}
