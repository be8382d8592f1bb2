//! Stage B: QueryPlan -> parameterized SQL (spec.md §4.3 Stage B). A
//! deterministic, total function from a validated plan to a SQL string plus
//! a parameter vector — never a string-interpolated user value.
//!
//! The main query has no `LIMIT`: a 1:N join (an `IN` filter over `agents`
//! or `subjects`, say) can emit more than one row per record, so truncation
//! has to happen in `bib-exec` after grouping rows back into Candidates,
//! not in SQL. `count_sql` mirrors spec.md §4.4 "Total count is obtained by
//! a separate COUNT(*) on the same WHERE" and counts distinct records.

use bib_core::model::{Filter, FilterField, FilterOp, FilterValue, Order, OrderDirection, QueryPlan};
use bib_core::schema::{self, column, evidence_projection};

use crate::error::{PlanError, Result};

/// A bound parameter. Kept as an enum rather than a trait object so the
/// executor can bind each variant against `sqlx` without type erasure.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Text(String),
    Int(i64),
}

/// The output of Stage B. `projection` lists, in column order, the
/// `(alias, field)` pairs the executor should decode each row by — `field`
/// is `None` for the always-present `record_id`/`mms_id` columns.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql: String,
    pub count_sql: String,
    pub params: Vec<Param>,
    pub evidence_fields: Vec<FilterField>,
}

/// Compiles a validated [`QueryPlan`] to SQL. Callers must run
/// `plan.validate_shape()` first — this function re-validates Schema
/// Contract membership (a check `validate_shape` can't do, since it has no
/// access to the contract) but assumes filter shape is already sound.
pub fn compile(plan: &QueryPlan) -> Result<CompiledQuery> {
    plan.validate_shape().map_err(PlanError::from)?;

    let mut joined_tables: Vec<&'static str> = vec![schema::table::TITLES];
    let mut predicates: Vec<String> = Vec::new();
    let mut params: Vec<Param> = Vec::new();
    let mut evidence_fields: Vec<FilterField> = vec![FilterField::Title];

    for filter in &plan.filters {
        let contract = schema::lookup(filter.field).map_err(|_| PlanError::PlanUnsupported(filter.field))?;
        if !joined_tables.contains(&contract.table) {
            joined_tables.push(contract.table);
        }
        if !evidence_fields.contains(&filter.field) {
            evidence_fields.push(filter.field);
        }
        let qualified = format!("{}.{}", contract.table, contract.column);
        compile_filter(filter, &qualified, &mut predicates, &mut params)?;
    }

    let mut from_clause = "records".to_string();
    for table in &joined_tables {
        from_clause.push_str(&format!(" JOIN {table} ON {table}.record_id = records.record_id"));
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };

    let order_clause = order_clause(plan.order.as_ref())?;

    let projection = projection_sql(&evidence_fields);
    let sql = format!("SELECT {projection} FROM {from_clause}{where_clause}{order_clause}");
    let count_sql = format!(
        "SELECT COUNT(DISTINCT records.{}) AS total FROM {from_clause}{where_clause}",
        column::RECORD_ID
    );

    Ok(CompiledQuery {
        sql,
        count_sql,
        params,
        evidence_fields,
    })
}

fn projection_sql(evidence_fields: &[FilterField]) -> String {
    let mut columns = vec![
        format!("records.{} AS record_id", column::RECORD_ID),
        format!("records.{} AS mms_id", column::MMS_ID),
    ];
    for field in evidence_fields {
        let contract_table = schema::lookup(*field).expect("field came from the contract").table;
        for (alias, real_column) in evidence_projection(*field) {
            columns.push(format!("{contract_table}.{real_column} AS {alias}"));
        }
    }
    columns.join(", ")
}

fn compile_filter(
    filter: &Filter,
    qualified_column: &str,
    predicates: &mut Vec<String>,
    params: &mut Vec<Param>,
) -> Result<()> {
    match (filter.op, &filter.value) {
        (FilterOp::Eq, FilterValue::Scalar(v)) => {
            predicates.push(format!("{qualified_column} = ?"));
            params.push(Param::Text(casefold(v)));
        }
        (FilterOp::In, FilterValue::List(values)) => {
            let placeholders = values.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            predicates.push(format!("{qualified_column} IN ({placeholders})"));
            for v in values {
                params.push(Param::Text(casefold(v)));
            }
        }
        (FilterOp::Range, FilterValue::Range { start, end }) => {
            predicates.push(format!("{qualified_column} BETWEEN ? AND ?"));
            params.push(Param::Int(*start));
            params.push(Param::Int(*end));
        }
        (FilterOp::Contains, FilterValue::Scalar(v)) => {
            if !schema::is_full_text(filter.field)? {
                return Err(PlanError::PlanInvalid {
                    path: format!("filters[].field={:?}", filter.field),
                    reason: "CONTAINS is only valid on a full-text column".into(),
                });
            }
            let fts_table = schema::lookup(filter.field)?
                .fts_table
                .expect("is_full_text confirmed Some");
            predicates.push(format!(
                "{qualified_column} IN (SELECT record_id FROM {fts_table} WHERE {fts_col} MATCH ?)",
                fts_col = fts_table.trim_end_matches("_fts"),
            ));
            params.push(Param::Text(quote_for_match(v)));
        }
        _ => {
            return Err(PlanError::PlanInvalid {
                path: format!("filters[].field={:?}", filter.field),
                reason: "op/value shape mismatch should have been caught by validate_shape".into(),
            })
        }
    }
    Ok(())
}

/// Case folding for scalar text params (spec.md §4.3) — applies to
/// `EQ`/`IN`, never to `CONTAINS`, whose quoting rule is separate.
fn casefold(v: &str) -> String {
    v.to_lowercase()
}

/// Phrase-quotes a multi-token FTS MATCH value, doubling embedded quotes;
/// single-token values pass through unquoted (spec.md §4.3).
fn quote_for_match(v: &str) -> String {
    if v.split_whitespace().count() > 1 {
        format!("\"{}\"", v.replace('"', "\"\""))
    } else {
        v.to_string()
    }
}

fn order_clause(order: Option<&Order>) -> Result<String> {
    match order {
        None => Ok(format!(" ORDER BY records.{} ASC", column::MMS_ID)),
        Some(o) => {
            let contract = schema::lookup(o.field).map_err(|_| PlanError::PlanUnsupported(o.field))?;
            let dir = match o.direction {
                OrderDirection::Asc => "ASC",
                OrderDirection::Desc => "DESC",
            };
            Ok(format!(" ORDER BY {}.{} {}", contract.table, contract.column, dir))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::{FilterField, FilterOp, FilterValue, QUERY_PLAN_VERSION};

    fn plan_with(filters: Vec<Filter>) -> QueryPlan {
        QueryPlan {
            version: QUERY_PLAN_VERSION.to_string(),
            intent: "search".into(),
            filters,
            limit: 25,
            order: None,
        }
    }

    #[test]
    fn eq_filter_casefolds_and_binds() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Place,
            op: FilterOp::Eq,
            value: FilterValue::Scalar("Paris".into()),
        }]);
        let compiled = compile(&plan).unwrap();
        assert!(compiled.sql.contains("imprints.place_norm = ?"));
        assert_eq!(compiled.params[0], Param::Text("paris".into()));
        assert!(compiled.sql.contains("ev_place_raw"));
        assert!(compiled.count_sql.contains("COUNT(DISTINCT records.record_id)"));
    }

    #[test]
    fn in_filter_expands_placeholders() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Language,
            op: FilterOp::In,
            value: FilterValue::List(vec!["fre".into(), "lat".into()]),
        }]);
        let compiled = compile(&plan).unwrap();
        assert!(compiled.sql.contains("languages.language_code IN (?, ?)"));
    }

    #[test]
    fn range_filter_uses_between() {
        let plan = plan_with(vec![Filter {
            field: FilterField::DateRange,
            op: FilterOp::Range,
            value: FilterValue::Range { start: 1500, end: 1599 },
        }]);
        let compiled = compile(&plan).unwrap();
        assert!(compiled.sql.contains("imprints.date_start BETWEEN ? AND ?"));
    }

    #[test]
    fn contains_on_non_fts_field_is_rejected() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Place,
            op: FilterOp::Contains,
            value: FilterValue::Scalar("paris".into()),
        }]);
        assert!(compile(&plan).is_err());
    }

    #[test]
    fn contains_multi_token_is_phrase_quoted() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Title,
            op: FilterOp::Contains,
            value: FilterValue::Scalar("old Paris".into()),
        }]);
        let compiled = compile(&plan).unwrap();
        assert_eq!(compiled.params.last(), Some(&Param::Text("\"old Paris\"".into())));
    }

    #[test]
    fn contains_single_token_is_unquoted() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Title,
            op: FilterOp::Contains,
            value: FilterValue::Scalar("Paris".into()),
        }]);
        let compiled = compile(&plan).unwrap();
        assert_eq!(compiled.params.last(), Some(&Param::Text("Paris".into())));
    }

    #[test]
    fn no_order_falls_back_to_mms_id_ascending() {
        let plan = plan_with(vec![]);
        let compiled = compile(&plan).unwrap();
        assert!(compiled.sql.contains("ORDER BY records.mms_id ASC"));
        assert_eq!(compiled.evidence_fields, vec![FilterField::Title]);
    }

    #[test]
    fn shape_mismatch_is_rejected_before_reaching_compile_filter() {
        let plan = plan_with(vec![Filter {
            field: FilterField::Agent,
            op: FilterOp::In,
            value: FilterValue::Scalar("x".into()),
        }]);
        assert!(compile(&plan).is_err());
    }

    #[test]
    fn no_filters_still_projects_title_evidence() {
        let plan = plan_with(vec![]);
        let compiled = compile(&plan).unwrap();
        assert!(compiled.sql.contains("ev_title_raw"));
    }
}
