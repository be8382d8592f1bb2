//! `METADATA_QUESTION` branch (spec.md §4.6 step 3e): answered from the
//! active subgroup with deterministic SQL, never routed through the NL
//! step. Count comes straight off the CandidateSet already held in session
//! state; date span needs one query against the subgroup's record ids.

use sqlx::{Row, SqlitePool};

use bib_core::model::CandidateSet;
use bib_core::schema::{column, table};

use crate::error::Result;

/// Record ids are chunked to stay under SQLite's default 999-variable
/// bind-parameter limit, same reasoning as `bib_agg`'s `ID_CHUNK_THRESHOLD`.
const CHUNK_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataAnswer {
    pub count: i64,
    pub earliest_year: Option<i64>,
    pub latest_year: Option<i64>,
}

/// Answers a metadata question about `subgroup` directly — `count` is the
/// subgroup's already-known total; `earliest_year`/`latest_year` come from
/// one `MIN`/`MAX` query over the subgroup's `mms_id`s, chunked if the
/// subgroup is large.
pub async fn answer(pool: &SqlitePool, subgroup: &CandidateSet) -> Result<MetadataAnswer> {
    let ids: Vec<&str> = subgroup.candidates.iter().map(|c| c.record_id.as_str()).collect();

    let mut earliest: Option<i64> = None;
    let mut latest: Option<i64> = None;

    for chunk in ids.chunks(CHUNK_SIZE) {
        if chunk.is_empty() {
            continue;
        }
        let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT MIN({imprints}.{date_start}) AS earliest, MAX({imprints}.{date_end}) AS latest \
             FROM {records} JOIN {imprints} ON {imprints}.record_id = {records}.{record_id} \
             WHERE {records}.{mms_id} IN ({placeholders})",
            records = table::RECORDS,
            imprints = table::IMPRINTS,
            date_start = column::DATE_START,
            date_end = column::DATE_END,
            record_id = column::RECORD_ID,
            mms_id = column::MMS_ID,
        );
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(*id);
        }
        let row = query.fetch_one(pool).await?;
        let chunk_earliest: Option<i64> = row.try_get("earliest").ok().flatten();
        let chunk_latest: Option<i64> = row.try_get("latest").ok().flatten();

        earliest = match (earliest, chunk_earliest) {
            (None, v) => v,
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, None) => a,
        };
        latest = match (latest, chunk_latest) {
            (None, v) => v,
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, None) => a,
        };
    }

    Ok(MetadataAnswer {
        count: subgroup.total_count,
        earliest_year: earliest,
        latest_year: latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::{Candidate, QueryPlan, QUERY_PLAN_VERSION};
    use bib_index::store::IndexStore;

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        IndexStore::new(pool.clone()).ensure_schema().await.unwrap();
        pool
    }

    async fn seed_record(pool: &SqlitePool, mms_id: &str, date_start: i64, date_end: i64) {
        let record_id = uuid::Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO records (record_id, mms_id, source_file, schema_version) VALUES (?, ?, 't.xml', '1.0')",
        )
        .bind(&record_id)
        .bind(mms_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO titles (record_id, title, title_raw, title_source_path) VALUES (?, ?, ?, '245$a')",
        )
        .bind(&record_id)
        .bind("Some Title")
        .bind("Some Title")
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO imprints (record_id, occurrence, \
             place_raw, place_confidence, place_method, place_source_path, \
             publisher_raw, publisher_confidence, publisher_method, publisher_source_path, \
             date_raw, date_start, date_end, date_confidence, date_method, date_source_path) \
             VALUES (?, 0, \
             'Paris', 1.0, 'exact', '260$a', \
             'Gallimard', 1.0, 'exact', '260$b', \
             'raw', ?, ?, 1.0, 'exact', '260$c')",
        )
        .bind(&record_id)
        .bind(date_start)
        .bind(date_end)
        .execute(pool)
        .await
        .unwrap();
    }

    fn subgroup(ids: &[&str], total: i64) -> CandidateSet {
        CandidateSet {
            query_text: "books".into(),
            query_plan: QueryPlan {
                version: QUERY_PLAN_VERSION.to_string(),
                intent: "search".into(),
                filters: vec![],
                limit: 50,
                order: None,
            },
            sql_executed: "select 1".into(),
            candidates: ids
                .iter()
                .map(|id| Candidate {
                    record_id: id.to_string(),
                    title: "t".into(),
                    match_rationale: "r".into(),
                    evidence: vec![],
                })
                .collect(),
            total_count: total,
            truncated: false,
        }
    }

    #[tokio::test]
    async fn count_comes_from_the_candidate_set_not_a_recount() {
        let pool = fresh_pool().await;
        seed_record(&pool, "mms1", 1850, 1850).await;
        let set = subgroup(&["mms1"], 42);
        let answer = answer(&pool, &set).await.unwrap();
        assert_eq!(answer.count, 42);
    }

    #[tokio::test]
    async fn date_span_covers_the_whole_subgroup() {
        let pool = fresh_pool().await;
        seed_record(&pool, "mms1", 1820, 1820).await;
        seed_record(&pool, "mms2", 1901, 1905).await;
        let set = subgroup(&["mms1", "mms2"], 2);
        let answer = answer(&pool, &set).await.unwrap();
        assert_eq!(answer.earliest_year, Some(1820));
        assert_eq!(answer.latest_year, Some(1905));
    }

    #[tokio::test]
    async fn empty_subgroup_has_no_date_span() {
        let pool = fresh_pool().await;
        let set = subgroup(&[], 0);
        let answer = answer(&pool, &set).await.unwrap();
        assert_eq!(answer.earliest_year, None);
        assert_eq!(answer.latest_year, None);
    }
}
