//! Aggregator (spec.md §4.5): deterministic, template-selected aggregation
//! SQL over a record-ID subset. The user's text never reaches SQL here —
//! only an [`AggregationIntent`] chosen upstream by the dialogue engine.

use sqlx::{Row, SqlitePool};

use bib_core::model::{AggregationBin, AggregationIntent, AggregationResult, DateBucket};
use bib_core::schema::{column, table};

use crate::error::Result;

/// Above this many input IDs, `IN (...)` placeholders risk SQLite's default
/// 999-variable limit; fall back to a temporary table instead (spec.md
/// §4.5 "chunked `IN` list ... single-row fallback threshold: 900 IDs").
const ID_CHUNK_THRESHOLD: usize = 900;

/// Rows inserted per `INSERT` statement when populating the temp table.
const INSERT_CHUNK_SIZE: usize = 500;

/// How many sample record IDs each bin carries, at most.
const SAMPLE_SIZE: usize = 5;

struct AggTemplate {
    table: &'static str,
    key_expr: String,
}

fn template_for(intent: AggregationIntent, date_bucket: Option<DateBucket>) -> AggTemplate {
    match intent {
        AggregationIntent::TopPublishers => AggTemplate {
            table: table::IMPRINTS,
            key_expr: format!("{}.publisher_norm", table::IMPRINTS),
        },
        AggregationIntent::PlaceDistribution => AggTemplate {
            table: table::IMPRINTS,
            key_expr: format!("{}.place_norm", table::IMPRINTS),
        },
        AggregationIntent::LanguageBreakdown => AggTemplate {
            table: table::LANGUAGES,
            key_expr: format!("{}.language_code", table::LANGUAGES),
        },
        AggregationIntent::SubjectClusters => AggTemplate {
            table: table::SUBJECTS,
            key_expr: format!("{}.subject_norm", table::SUBJECTS),
        },
        AggregationIntent::AgentBreakdown => AggTemplate {
            table: table::AGENTS,
            key_expr: format!("{}.agent_norm", table::AGENTS),
        },
        AggregationIntent::DateDistribution => {
            let bucket_size = match date_bucket.unwrap_or(DateBucket::Decade) {
                DateBucket::Decade => 10,
                DateBucket::Century => 100,
            };
            AggTemplate {
                table: table::IMPRINTS,
                key_expr: format!(
                    "CAST(({table}.date_start / {bucket_size}) * {bucket_size} AS TEXT) || '-' || \
                     CAST((({table}.date_start / {bucket_size}) * {bucket_size}) + {bucket_size} - 1 AS TEXT)",
                    table = table::IMPRINTS,
                ),
            }
        }
        AggregationIntent::CountOnly => unreachable!("count_only never builds a template"),
    }
}

/// Aggregates `ids` by `intent`. `ids` are `mms_id`s — the stable external
/// identifier `Candidate::record_id` is populated from (spec.md §3.1), not
/// the internal `records.record_id` UUID primary key — matching the same
/// `mms_id` idiom `bib_dialogue::metadata::answer` uses for its own
/// subgroup query. `date_bucket` only applies to `DateDistribution` and is
/// ignored otherwise. `total` is always `ids.len()` — the size of the
/// record-ID subset under consideration, not a sum over bins (a record can
/// appear in more than one bin, e.g. a multilingual work in
/// `language_breakdown`).
pub async fn aggregate(
    pool: &SqlitePool,
    ids: &[String],
    intent: AggregationIntent,
    date_bucket: Option<DateBucket>,
) -> Result<AggregationResult> {
    let total = ids.len() as i64;
    if intent == AggregationIntent::CountOnly || ids.is_empty() {
        return Ok(AggregationResult {
            intent,
            bins: Vec::new(),
            total,
        });
    }

    let template = template_for(intent, date_bucket);
    let mut conn = pool.acquire().await?;

    let bins = if ids.len() <= ID_CHUNK_THRESHOLD {
        query_with_in_list(&mut conn, &template, ids).await?
    } else {
        query_with_temp_table(&mut conn, &template, ids).await?
    };

    Ok(AggregationResult { intent, bins, total })
}

fn build_sql(template: &AggTemplate, predicate: &str) -> String {
    format!(
        "WITH filtered AS (\n\
           SELECT DISTINCT records.record_id AS record_id, records.mms_id AS mms_id, {key_expr} AS bin_key\n\
           FROM records JOIN {table} ON {table}.record_id = records.record_id\n\
           WHERE {predicate} AND {key_expr} IS NOT NULL\n\
         ),\n\
         ranked AS (\n\
           SELECT record_id, mms_id, bin_key,\n\
                  ROW_NUMBER() OVER (PARTITION BY bin_key ORDER BY mms_id ASC) AS rn\n\
           FROM filtered\n\
         )\n\
         SELECT bin_key AS key, COUNT(*) AS count,\n\
                GROUP_CONCAT(CASE WHEN rn <= {sample_size} THEN mms_id END) AS sample_ids\n\
         FROM ranked\n\
         GROUP BY bin_key\n\
         ORDER BY count DESC, bin_key ASC",
        key_expr = template.key_expr,
        table = template.table,
        sample_size = SAMPLE_SIZE,
    )
}

async fn query_with_in_list(
    conn: &mut sqlx::SqliteConnection,
    template: &AggTemplate,
    ids: &[String],
) -> Result<Vec<AggregationBin>> {
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let predicate = format!("records.{} IN ({placeholders})", column::MMS_ID);
    let sql = build_sql(template, &predicate);

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }
    let rows = query.fetch_all(&mut *conn).await?;
    Ok(rows.iter().map(row_to_bin).collect())
}

async fn query_with_temp_table(
    conn: &mut sqlx::SqliteConnection,
    template: &AggTemplate,
    ids: &[String],
) -> Result<Vec<AggregationBin>> {
    sqlx::query("CREATE TEMPORARY TABLE agg_ids (mms_id TEXT NOT NULL)")
        .execute(&mut *conn)
        .await?;

    for chunk in ids.chunks(INSERT_CHUNK_SIZE) {
        let placeholders = chunk.iter().map(|_| "(?)").collect::<Vec<_>>().join(", ");
        let sql = format!("INSERT INTO agg_ids (mms_id) VALUES {placeholders}");
        let mut query = sqlx::query(&sql);
        for id in chunk {
            query = query.bind(id);
        }
        query.execute(&mut *conn).await?;
    }

    let predicate = format!("records.{} IN (SELECT mms_id FROM agg_ids)", column::MMS_ID);
    let sql = build_sql(template, &predicate);
    let rows = sqlx::query(&sql).fetch_all(&mut *conn).await?;
    let bins = rows.iter().map(row_to_bin).collect();

    sqlx::query("DROP TABLE agg_ids").execute(&mut *conn).await?;
    Ok(bins)
}

fn row_to_bin(row: &sqlx::sqlite::SqliteRow) -> AggregationBin {
    let key: String = row.get("key");
    let count: i64 = row.get("count");
    let sample_ids: Option<String> = row.try_get::<Option<String>, _>("sample_ids").ok().flatten();
    let sample_ids = sample_ids.map(|s| s.split(',').map(String::from).collect());
    AggregationBin { key, count, sample_ids }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_index::IndexStore;
    use sqlx::SqlitePool;

    /// Seeds a record directly via SQL (bypassing `IndexStore::index_batch`,
    /// whose input shape is the MARC pipeline's concern, not the
    /// aggregator's) with one imprint row. Returns `mms_id` — the external
    /// identifier `aggregate` takes, not the internal `record_id` UUID.
    async fn seed_record(pool: &SqlitePool, mms_id: &str, publisher_norm: &str, date_start: i64) -> String {
        let record_id = uuid::Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO records (record_id, mms_id, source_file, schema_version) VALUES (?, ?, 't.xml', '1.0')")
            .bind(&record_id)
            .bind(mms_id)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO imprints (record_id, occurrence, \
             place_raw, place_norm, place_confidence, place_method, place_source_path, \
             publisher_raw, publisher_norm, publisher_confidence, publisher_method, publisher_source_path, \
             date_raw, date_start, date_end, date_confidence, date_method, date_source_path) \
             VALUES (?, 0, \
             'Paris', 'paris', 1.0, 'exact', '260$a', \
             ?, ?, 1.0, 'exact', '260$b', \
             ?, ?, ?, 1.0, 'exact', '260$c')",
        )
        .bind(&record_id)
        .bind(publisher_norm)
        .bind(publisher_norm)
        .bind(date_start.to_string())
        .bind(date_start)
        .bind(date_start)
        .execute(pool)
        .await
        .unwrap();
        mms_id.to_string()
    }

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        IndexStore::new(pool.clone()).ensure_schema().await.unwrap();
        pool
    }

    #[tokio::test]
    async fn top_publishers_groups_and_sorts() {
        let pool = fresh_pool().await;
        let id1 = seed_record(&pool, "m1", "plon", 1850).await;
        let id2 = seed_record(&pool, "m2", "plon", 1851).await;
        let id3 = seed_record(&pool, "m3", "gallimard", 1900).await;

        let result = aggregate(&pool, &[id1, id2, id3], AggregationIntent::TopPublishers, None)
            .await
            .unwrap();
        assert_eq!(result.total, 3);
        assert_eq!(result.bins[0].key, "plon");
        assert_eq!(result.bins[0].count, 2);
        assert_eq!(result.bins[1].key, "gallimard");
        assert_eq!(result.bins[1].count, 1);
    }

    #[tokio::test]
    async fn date_distribution_buckets_by_decade() {
        let pool = fresh_pool().await;
        let id1 = seed_record(&pool, "m1", "plon", 1851).await;
        let id2 = seed_record(&pool, "m2", "plon", 1859).await;

        let result = aggregate(
            &pool,
            &[id1, id2],
            AggregationIntent::DateDistribution,
            Some(DateBucket::Decade),
        )
        .await
        .unwrap();
        assert_eq!(result.bins.len(), 1);
        assert_eq!(result.bins[0].key, "1850-1859");
        assert_eq!(result.bins[0].count, 2);
    }

    #[tokio::test]
    async fn count_only_short_circuits_without_a_query() {
        let result = aggregate(
            &sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap(),
            &["a".into(), "b".into()],
            AggregationIntent::CountOnly,
            None,
        )
        .await
        .unwrap();
        assert_eq!(result.total, 2);
        assert!(result.bins.is_empty());
    }
}
