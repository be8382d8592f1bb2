//! Write-through enrichment cache (spec.md §4.7 "Cache policy"). Mirrors the
//! `bib-index`/`bib-sessions` shape: a newtype over a pool, runtime-checked
//! `sqlx::query`.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use bib_core::model::{EnrichmentResult, EntityType};
use bib_core::ports::{self, Result as PortResult};

use crate::error::Result;

pub struct SqliteEnrichmentCacheStore {
    pool: SqlitePool,
}

impl SqliteEnrichmentCacheStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in crate::schema_sql::CREATE_SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get(&self, entity_type: &str, normalized_key: &str) -> Result<Option<EnrichmentResult>> {
        let row = sqlx::query(
            "SELECT result FROM enrichment_cache WHERE entity_type = ? AND normalized_key = ?",
        )
        .bind(entity_type)
        .bind(normalized_key)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            None => Ok(None),
            Some(row) => {
                let raw: String = row.get("result");
                let result: EnrichmentResult = serde_json::from_str(&raw).map_err(|e| anyhow!(e))?;
                Ok(Some(result))
            }
        }
    }

    pub async fn put(&self, result: &EnrichmentResult) -> Result<()> {
        let data = serde_json::to_string(result).map_err(|e| anyhow!(e))?;
        sqlx::query(
            "INSERT INTO enrichment_cache (entity_type, normalized_key, result, fetched_at, expires_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (entity_type, normalized_key) DO UPDATE SET \
               result = excluded.result, fetched_at = excluded.fetched_at, expires_at = excluded.expires_at",
        )
        .bind(entity_type_str(result.entity_type))
        .bind(&result.normalized_key)
        .bind(data)
        .bind(result.fetched_at.to_rfc3339())
        .bind(result.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn reap_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM enrichment_cache WHERE expires_at <= ?")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
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

#[async_trait]
impl ports::EnrichmentCacheStore for SqliteEnrichmentCacheStore {
    async fn get(&self, entity_type: &str, normalized_key: &str) -> PortResult<Option<EnrichmentResult>> {
        SqliteEnrichmentCacheStore::get(self, entity_type, normalized_key)
            .await
            .map_err(|e| bib_core::CoreError::Internal(anyhow!(e)))
    }

    async fn put(&self, result: &EnrichmentResult) -> PortResult<()> {
        SqliteEnrichmentCacheStore::put(self, result)
            .await
            .map_err(|e| bib_core::CoreError::Internal(anyhow!(e)))
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> PortResult<u64> {
        SqliteEnrichmentCacheStore::reap_expired(self, now)
            .await
            .map_err(|e| bib_core::CoreError::Internal(anyhow!(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::EnrichmentSource;
    use chrono::Duration;

    async fn fresh_store() -> SqliteEnrichmentCacheStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = SqliteEnrichmentCacheStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    fn sample(key: &str, expires_in: Duration) -> EnrichmentResult {
        let now = Utc::now();
        EnrichmentResult {
            entity_type: EntityType::Person,
            entity_value: "Hugo, Victor".into(),
            normalized_key: key.into(),
            wikidata_id: Some("Q535".into()),
            viaf_id: None,
            isni_id: None,
            loc_id: None,
            nli_id: None,
            person_info: None,
            place_info: None,
            label: "Victor Hugo".into(),
            description: "French writer".into(),
            source: EnrichmentSource::NameSearch,
            confidence: 0.9,
            raw: serde_json::Value::Null,
            fetched_at: now,
            expires_at: now + expires_in,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = fresh_store().await;
        let result = sample("hugo victor", Duration::days(30));
        store.put(&result).await.unwrap();
        let fetched = store.get("person", "hugo victor").await.unwrap().unwrap();
        assert_eq!(fetched.wikidata_id, Some("Q535".into()));
    }

    #[tokio::test]
    async fn reap_expired_removes_only_expired_rows() {
        let store = fresh_store().await;
        store.put(&sample("fresh", Duration::days(30))).await.unwrap();
        store.put(&sample("stale", Duration::days(-1))).await.unwrap();

        let removed = store.reap_expired(Utc::now()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get("person", "fresh").await.unwrap().is_some());
        assert!(store.get("person", "stale").await.unwrap().is_none());
    }
}
