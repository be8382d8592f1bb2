//! Storage port traits — implemented by `bib-index`, `bib-plan`,
//! `bib-sessions`, and `bib-enrich`. Core logic depends only on these
//! traits, never on `sqlx` directly (mirrors the teacher's
//! `sem_os_core::ports` / `sem_os_postgres` split).

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{EnrichmentResult, QueryPlan, Session};

pub type Result<T> = std::result::Result<T, CoreError>;

/// A single projected row from the index, generic over a closure the caller
/// supplies to interpret columns — kept intentionally loose here since the
/// concrete row shape lives with `bib-exec`, which depends on `sqlx`
/// directly to decode rows. This port only concerns read-only access that
/// doesn't need row-level typing: schema introspection for the startup
/// check in `bib_core::schema`.
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Table name -> column names, as reported by the live database.
    async fn live_columns(&self) -> Result<std::collections::HashMap<String, Vec<String>>>;
}

/// The plan cache (spec.md §4.3 "Plan cache"): a persistent
/// request-fingerprint -> QueryPlan store for idempotence of identical
/// questions. Append-only, file-backed, read on process start.
#[async_trait]
pub trait PlanCacheStore: Send + Sync {
    async fn get(&self, cache_key: &str) -> Result<Option<CachedPlan>>;
    async fn put(&self, cache_key: &str, plan: &CachedPlan) -> Result<()>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedPlan {
    pub query_plan: QueryPlan,
    pub model_id: String,
}

/// Durable per-session state (spec.md §3.2 "Session is exclusively owned by
/// the Session Store; all state changes go through its API").
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;
    async fn get(&self, id: uuid::Uuid) -> Result<Option<Session>>;
    async fn save(&self, session: &Session) -> Result<()>;
    async fn delete(&self, id: uuid::Uuid) -> Result<()>;
}

/// Write-through cache over external authority services (spec.md §4.7
/// "Cache policy"). Readers receive immutable snapshots (spec.md §3.2).
#[async_trait]
pub trait EnrichmentCacheStore: Send + Sync {
    async fn get(&self, entity_type: &str, normalized_key: &str) -> Result<Option<EnrichmentResult>>;
    async fn put(&self, result: &EnrichmentResult) -> Result<()>;
    /// Deletes every row whose `expires_at` is at or before `now`. Returns
    /// the number of rows removed — used by the background reaper.
    async fn reap_expired(&self, now: chrono::DateTime<chrono::Utc>) -> Result<u64>;
}
