//! Read-only execution of a compiled plan into a [`CandidateSet`] (spec.md
//! §4.4). Mirrors `sem_os_postgres::store`'s row-to-domain-type mapping and
//! keeps Evidence as plain value types separate from persistence, following
//! `sem_os_core::evidence`.

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use bib_core::model::{Candidate, CandidateSet, Evidence, Filter, FilterField, FilterOp, FilterValue, QueryPlan};
use bib_core::schema::evidence_projection;
use bib_plan::{compile_plan, Param};

use crate::error::Result;

/// Executes `plan` against `pool` and assembles a [`CandidateSet`].
/// `query_text` is carried through verbatim for the returned set's
/// provenance (spec.md GLOSSARY "CandidateSet").
pub async fn execute(pool: &SqlitePool, plan: &QueryPlan, query_text: &str) -> Result<CandidateSet> {
    let compiled = compile_plan(plan)?;

    let total_count: i64 = {
        let mut query = sqlx::query_scalar(&compiled.count_sql);
        for param in &compiled.params {
            query = bind_scalar(query, param);
        }
        query.fetch_one(pool).await?
    };

    let mut query = sqlx::query(&compiled.sql);
    for param in &compiled.params {
        query = bind(query, param);
    }
    let rows = query.fetch_all(pool).await?;

    let rationale = match_rationale(&plan.filters);

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Candidate> = HashMap::new();

    for row in &rows {
        // `record_id` groups rows (it's the synthetic per-record UUID);
        // `mms_id` is what's surfaced to callers as `Candidate::record_id`,
        // since it's the stable key across re-index runs (spec.md §3.1).
        let record_id: String = row.get("record_id");
        let mms_id: String = row.get("mms_id");
        let title_raw: String = row.try_get("ev_title_raw").unwrap_or_default();

        let entry = grouped.entry(record_id.clone()).or_insert_with(|| {
            order.push(record_id.clone());
            Candidate {
                record_id: mms_id.clone(),
                title: title_raw.clone(),
                match_rationale: rationale.clone(),
                evidence: Vec::new(),
            }
        });

        for field in &compiled.evidence_fields {
            for evidence in evidence_from_row(row, *field) {
                if !entry
                    .evidence
                    .iter()
                    .any(|e| e.db_column == evidence.db_column && e.value == evidence.value)
                {
                    entry.evidence.push(evidence);
                }
            }
        }
    }

    let limit = plan.limit as usize;
    let candidates = order
        .into_iter()
        .take(limit)
        .map(|id| grouped.remove(&id).expect("id was just inserted into order"))
        .collect::<Vec<_>>();
    let truncated = total_count > plan.limit as i64;

    Ok(CandidateSet {
        query_text: query_text.to_string(),
        query_plan: plan.clone(),
        sql_executed: compiled.sql,
        candidates,
        total_count,
        truncated,
    })
}

/// Re-runs `plan`'s compiled query and returns every matching record's
/// `mms_id`, not just the page that ends up in `CandidateSet::candidates`
/// after the display limit is applied. The Aggregator (spec.md §4.5)
/// operates over the full active subgroup — e.g. scenario 5's 705-record
/// subgroup aggregates into 5 publisher bins, not just however many
/// candidates were returned for display.
pub async fn all_matching_ids(pool: &SqlitePool, plan: &QueryPlan) -> Result<Vec<String>> {
    let compiled = compile_plan(plan)?;

    let mut query = sqlx::query(&compiled.sql);
    for param in &compiled.params {
        query = bind(query, param);
    }
    let rows = query.fetch_all(pool).await?;

    let mut order: Vec<String> = Vec::new();
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    for row in &rows {
        let record_id: String = row.get("record_id");
        let mms_id: String = row.get("mms_id");
        if seen.insert(record_id) {
            order.push(mms_id);
        }
    }
    Ok(order)
}

/// Builds Evidence entries for one field from one row, reading the aliases
/// the Plan Compiler projected under (`bib_core::schema::evidence_projection`).
fn evidence_from_row(row: &SqliteRow, field: FilterField) -> Vec<Evidence> {
    let get = |alias: &str| -> Option<String> { row.try_get::<Option<String>, _>(alias).ok().flatten() };
    let get_i64 = |alias: &str| -> Option<i64> { row.try_get::<Option<i64>, _>(alias).ok().flatten() };
    let get_f64 = |alias: &str| -> Option<f64> { row.try_get::<Option<f64>, _>(alias).ok().flatten() };

    match field {
        FilterField::Place => build_simple(get("ev_place_raw"), get("ev_place_source_path"), "place_raw", get("ev_place_norm"), get_f64("ev_place_confidence")),
        FilterField::Publisher => build_simple(get("ev_publisher_raw"), get("ev_publisher_source_path"), "publisher_raw", get("ev_publisher_norm"), get_f64("ev_publisher_confidence")),
        FilterField::Agent => build_simple(get("ev_agent_raw"), get("ev_agent_source_path"), "agent_raw", get("ev_agent_norm"), None),
        FilterField::Subject => build_simple(get("ev_subject_raw"), get("ev_subject_source_path"), "subject_raw", get("ev_subject_norm"), None),
        FilterField::Title => build_simple(get("ev_title_raw"), get("ev_title_source_path"), "title_raw", None, None),
        FilterField::Language => build_simple(get("ev_language_code"), get("ev_language_source_path"), "language_code", None, None),
        FilterField::DateRange => {
            let raw = get("ev_date_raw");
            let source_path = get("ev_date_source_path");
            let (Some(raw), Some(source_path)) = (raw, source_path) else {
                return Vec::new();
            };
            let start = get_i64("ev_date_start");
            let end = get_i64("ev_date_end");
            let normalized = match (start, end) {
                (Some(s), Some(e)) if s == e => Some(s.to_string()),
                (Some(s), Some(e)) => Some(format!("{s}..{e}")),
                _ => None,
            };
            vec![Evidence {
                field_path: source_path,
                db_column: "date_start".to_string(),
                value: raw,
                normalized_value: normalized,
                confidence: get_f64("ev_date_confidence"),
            }]
        }
    }
}

fn build_simple(
    raw: Option<String>,
    source_path: Option<String>,
    db_column: &str,
    normalized: Option<String>,
    confidence: Option<f64>,
) -> Vec<Evidence> {
    let (Some(raw), Some(source_path)) = (raw, source_path) else {
        return Vec::new();
    };
    vec![Evidence {
        field_path: source_path,
        db_column: db_column.to_string(),
        value: raw,
        normalized_value: normalized,
        confidence,
    }]
}

/// A short machine-readable summary of which filters matched (spec.md §4.4
/// step 3), e.g. `"place=paris AND date BETWEEN 1500 AND 1599"`.
fn match_rationale(filters: &[Filter]) -> String {
    if filters.is_empty() {
        return "no filters".to_string();
    }
    filters
        .iter()
        .map(describe_filter)
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn describe_filter(filter: &Filter) -> String {
    let field = format!("{:?}", filter.field).to_lowercase();
    match (filter.op, &filter.value) {
        (FilterOp::Eq, FilterValue::Scalar(v)) => format!("{field}={}", v.to_lowercase()),
        (FilterOp::Contains, FilterValue::Scalar(v)) => format!("{field} CONTAINS {v:?}"),
        (FilterOp::In, FilterValue::List(values)) => {
            format!("{field} IN ({})", values.join(", "))
        }
        (FilterOp::Range, FilterValue::Range { start, end }) => {
            format!("{field} BETWEEN {start} AND {end}")
        }
        _ => format!("{field} (malformed filter)"),
    }
}

fn bind<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    param: &Param,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match param.clone() {
        Param::Text(t) => query.bind(t),
        Param::Int(i) => query.bind(i),
    }
}

fn bind_scalar<'q, O>(
    query: sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>>,
    param: &Param,
) -> sqlx::query::QueryScalar<'q, sqlx::Sqlite, O, sqlx::sqlite::SqliteArguments<'q>> {
    match param.clone() {
        Param::Text(t) => query.bind(t),
        Param::Int(i) => query.bind(i),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::{FilterField, FilterOp, FilterValue};

    #[test]
    fn rationale_describes_eq_and_range() {
        let filters = vec![
            Filter {
                field: FilterField::Place,
                op: FilterOp::Eq,
                value: FilterValue::Scalar("Paris".into()),
            },
            Filter {
                field: FilterField::DateRange,
                op: FilterOp::Range,
                value: FilterValue::Range { start: 1500, end: 1599 },
            },
        ];
        assert_eq!(
            match_rationale(&filters),
            "place=paris AND daterange BETWEEN 1500 AND 1599"
        );
    }

    #[test]
    fn empty_filters_rationale() {
        assert_eq!(match_rationale(&[]), "no filters");
    }
}
