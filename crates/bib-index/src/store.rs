//! SQLite-backed index store. Mirrors the teacher's `sem_os_postgres::store`
//! shape: a newtype wrapping a pool, runtime-checked `sqlx::query` (never
//! `query!`) so the workspace never needs a live DB at compile time.

use std::collections::HashMap;

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use bib_core::model::EnrichedRecord;
use bib_core::normalizer::{self, AliasMap};
use bib_core::ports::{Result as PortResult, SchemaIntrospector};
use bib_core::schema::{self, schema_version_string};

use crate::error::{IndexError, Result};

/// SQLite-backed implementation of the relational index (spec.md §4.2).
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates every table/index declared in [`crate::schema_sql::CREATE_SCHEMA`].
    /// Idempotent — safe to call on every process start.
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

    /// Indexes one batch of enriched records in a single transaction
    /// (spec.md §4.2 "a single transaction per batch"). `agent_aliases` is
    /// reused from the agent-normalization alias map; subjects have no
    /// alias map of their own (see `bib_core::normalizer::casefold_key`).
    pub async fn index_batch(
        &self,
        records: &[EnrichedRecord],
        agent_aliases: &AliasMap,
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut count = 0usize;

        for enriched in records {
            if !enriched.imprints_aligned() {
                return Err(IndexError::RecordInvariant(format!(
                    "record {} has {} imprints but {} imprints_norm entries",
                    enriched.record.mms_id,
                    enriched.record.imprints.len(),
                    enriched.m2.imprints_norm.len(),
                )));
            }

            let record = &enriched.record;
            let record_id = Uuid::new_v4().to_string();

            sqlx::query(
                "INSERT INTO records (record_id, mms_id, source_file, schema_version) VALUES (?, ?, ?, ?)",
            )
            .bind(&record_id)
            .bind(&record.mms_id)
            .bind(&record.source_file)
            .bind(schema_version_string())
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO titles (record_id, title, title_raw, title_source_path) VALUES (?, ?, ?, ?)",
            )
            .bind(&record_id)
            .bind(record.title.value.to_lowercase())
            .bind(&record.title.value)
            .bind(&record.title.source_path)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO titles_fts (title, record_id) VALUES (?, ?)")
                .bind(&record.title.value)
                .bind(&record_id)
                .execute(&mut *tx)
                .await?;

            for (i, (imprint, norm)) in record
                .imprints
                .iter()
                .zip(enriched.m2.imprints_norm.iter())
                .enumerate()
            {
                let occurrence = i as i64;
                sqlx::query(
                    r#"INSERT INTO imprints (
                        record_id, occurrence,
                        date_raw, date_start, date_end, date_confidence, date_method, date_source_path,
                        place_raw, place_norm, place_confidence, place_method, place_source_path,
                        publisher_raw, publisher_norm, publisher_confidence, publisher_method, publisher_source_path
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(&record_id)
                .bind(occurrence)
                .bind(&imprint.date.value)
                .bind(norm.date_norm.start)
                .bind(norm.date_norm.end)
                .bind(norm.date_norm.confidence)
                .bind(serde_json::to_string(&norm.date_norm.method).map_err(|e| anyhow!(e))?)
                .bind(&imprint.date.source_path)
                .bind(&imprint.place.value)
                .bind(&norm.place_norm.value)
                .bind(norm.place_norm.confidence)
                .bind(serde_json::to_string(&norm.place_norm.method).map_err(|e| anyhow!(e))?)
                .bind(&imprint.place.source_path)
                .bind(&imprint.publisher.value)
                .bind(&norm.publisher_norm.value)
                .bind(norm.publisher_norm.confidence)
                .bind(serde_json::to_string(&norm.publisher_norm.method).map_err(|e| anyhow!(e))?)
                .bind(&imprint.publisher.source_path)
                .execute(&mut *tx)
                .await?;
            }

            for (i, agent) in record.agents.iter().enumerate() {
                let norm = normalizer::normalize_agent(Some(&agent.name.value), agent_aliases, vec![]);
                sqlx::query(
                    "INSERT INTO agents (record_id, occurrence, agent_raw, agent_norm, agent_source_path) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&record_id)
                .bind(i as i64)
                .bind(&agent.name.value)
                .bind(&norm.value)
                .bind(&agent.name.source_path)
                .execute(&mut *tx)
                .await?;
            }

            for (i, subject) in record.subjects.iter().enumerate() {
                let norm = normalizer::casefold_key(&subject.heading.value);
                sqlx::query(
                    "INSERT INTO subjects (record_id, occurrence, subject_raw, subject_norm, subject_source_path) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&record_id)
                .bind(i as i64)
                .bind(&subject.heading.value)
                .bind(&norm)
                .bind(&subject.heading.source_path)
                .execute(&mut *tx)
                .await?;

                sqlx::query("INSERT INTO subjects_fts (subject, record_id) VALUES (?, ?)")
                    .bind(&subject.heading.value)
                    .bind(&record_id)
                    .execute(&mut *tx)
                    .await?;
            }

            for (i, language) in record.languages.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO languages (record_id, occurrence, language_code, language_source_path) VALUES (?, ?, ?, ?)",
                )
                .bind(&record_id)
                .bind(i as i64)
                .bind(&language.code.value)
                .bind(&language.code.source_path)
                .execute(&mut *tx)
                .await?;
            }

            for (i, note) in record.notes.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO notes (record_id, occurrence, note_text, note_source_path) VALUES (?, ?, ?, ?)",
                )
                .bind(&record_id)
                .bind(i as i64)
                .bind(&note.text.value)
                .bind(&note.text.source_path)
                .execute(&mut *tx)
                .await?;
            }

            count += 1;
        }

        tx.commit().await?;
        tracing::info!(count, "indexed batch");
        Ok(count)
    }
}

#[async_trait]
impl SchemaIntrospector for IndexStore {
    async fn live_columns(&self) -> PortResult<HashMap<String, Vec<String>>> {
        let mut out = HashMap::new();
        for table in [
            schema::table::RECORDS,
            schema::table::TITLES,
            schema::table::IMPRINTS,
            schema::table::SUBJECTS,
            schema::table::AGENTS,
            schema::table::LANGUAGES,
            schema::table::NOTES,
        ] {
            let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| bib_core::CoreError::Internal(anyhow!(e)))?;
            let cols = rows
                .iter()
                .map(|r| r.get::<String, _>("name"))
                .collect::<Vec<_>>();
            out.insert(table.to_string(), cols);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::{Agent, CanonicalRecord, Imprint, ImprintNorm, Subject, M2};
    use bib_core::normalizer::{normalize_date, normalize_place, normalize_publisher};
    use bib_core::model::SourcedValue;

    async fn fresh_store() -> IndexStore {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = IndexStore::new(pool);
        store.ensure_schema().await.unwrap();
        store
    }

    fn sample_record() -> EnrichedRecord {
        let aliases = AliasMap::empty();
        let date = normalize_date(Some("1990"), vec!["260[1]$c".into()]);
        let place = normalize_place(Some("Paris :"), &aliases, vec!["260[1]$a".into()]);
        let publisher = normalize_publisher(Some("Gallimard,"), &aliases, vec!["260[1]$b".into()]);
        EnrichedRecord {
            record: CanonicalRecord {
                mms_id: "mms001".into(),
                source_file: "test.xml".into(),
                jsonl_line_number: 1,
                title: SourcedValue::new("A history of Paris", "245[1]$a"),
                imprints: vec![Imprint {
                    place: SourcedValue::new("Paris :", "260[1]$a"),
                    publisher: SourcedValue::new("Gallimard,", "260[1]$b"),
                    date: SourcedValue::new("1990", "260[1]$c"),
                }],
                agents: vec![Agent {
                    name: SourcedValue::new("Dupont, Jean", "100[1]$a"),
                    role: None,
                }],
                subjects: vec![Subject {
                    heading: SourcedValue::new("France -- History", "650[1]$a"),
                }],
                languages: vec![],
                notes: vec![],
            },
            m2: M2 {
                imprints_norm: vec![ImprintNorm {
                    date_norm: date,
                    place_norm: place,
                    publisher_norm: publisher,
                }],
            },
        }
    }

    #[tokio::test]
    async fn indexes_a_batch_and_reports_count() {
        let store = fresh_store().await;
        let n = store
            .index_batch(&[sample_record()], &AliasMap::empty())
            .await
            .unwrap();
        assert_eq!(n, 1);

        let row = sqlx::query("SELECT mms_id FROM records")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(row.get::<String, _>("mms_id"), "mms001");
    }

    #[tokio::test]
    async fn rejects_misaligned_imprints() {
        let store = fresh_store().await;
        let mut record = sample_record();
        record.record.imprints.push(Imprint {
            place: SourcedValue::new("", "260[2]$a"),
            publisher: SourcedValue::new("", "260[2]$b"),
            date: SourcedValue::new("", "260[2]$c"),
        });
        let err = store
            .index_batch(&[record], &AliasMap::empty())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::RecordInvariant(_)));
    }

    #[tokio::test]
    async fn live_columns_matches_schema_contract() {
        let store = fresh_store().await;
        let live = store.live_columns().await.unwrap();
        assert!(schema::assert_contract_matches_live_schema(&live).is_ok());
    }
}
