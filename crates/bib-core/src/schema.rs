//! The Schema Contract — spec.md §4.2 and §6.5.
//!
//! A single source of truth enumerating tables, columns, and their relation
//! to QueryPlan filter fields. The query builder (`bib-plan`) and the
//! executor (`bib-exec`) must reference only the constants below; nothing
//! downstream hardcodes a table or column name as a string literal.
//!
//! `schema_version` on `records` carries a `MAJOR.MINOR` pair: MINOR bumps
//! (column add, table add, index add) need no rebuild, MAJOR bumps
//! (rename, drop, type change) require a full rebuild from enriched JSONL —
//! never an in-place migration.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{CoreError, Result};
use crate::model::FilterField;

pub const SCHEMA_VERSION_MAJOR: u32 = 1;
pub const SCHEMA_VERSION_MINOR: u32 = 0;

pub fn schema_version_string() -> String {
    format!("{SCHEMA_VERSION_MAJOR}.{SCHEMA_VERSION_MINOR}")
}

pub mod table {
    pub const RECORDS: &str = "records";
    pub const TITLES: &str = "titles";
    pub const IMPRINTS: &str = "imprints";
    pub const SUBJECTS: &str = "subjects";
    pub const AGENTS: &str = "agents";
    pub const LANGUAGES: &str = "languages";
    pub const NOTES: &str = "notes";
    pub const TITLES_FTS: &str = "titles_fts";
    pub const SUBJECTS_FTS: &str = "subjects_fts";
}

pub mod column {
    pub const RECORD_ID: &str = "record_id";
    pub const MMS_ID: &str = "mms_id";
    pub const SCHEMA_VERSION: &str = "schema_version";

    pub const TITLE: &str = "title";
    pub const TITLE_RAW: &str = "title_raw";
    pub const TITLE_SOURCE_PATH: &str = "title_source_path";

    pub const DATE_RAW: &str = "date_raw";
    pub const DATE_START: &str = "date_start";
    pub const DATE_END: &str = "date_end";
    pub const DATE_CONFIDENCE: &str = "date_confidence";
    pub const DATE_METHOD: &str = "date_method";
    pub const DATE_SOURCE_PATH: &str = "date_source_path";

    pub const PLACE_RAW: &str = "place_raw";
    pub const PLACE_NORM: &str = "place_norm";
    pub const PLACE_CONFIDENCE: &str = "place_confidence";
    pub const PLACE_METHOD: &str = "place_method";
    pub const PLACE_SOURCE_PATH: &str = "place_source_path";

    pub const PUBLISHER_RAW: &str = "publisher_raw";
    pub const PUBLISHER_NORM: &str = "publisher_norm";
    pub const PUBLISHER_CONFIDENCE: &str = "publisher_confidence";
    pub const PUBLISHER_METHOD: &str = "publisher_method";
    pub const PUBLISHER_SOURCE_PATH: &str = "publisher_source_path";

    pub const AGENT_RAW: &str = "agent_raw";
    pub const AGENT_NORM: &str = "agent_norm";
    pub const AGENT_SOURCE_PATH: &str = "agent_source_path";

    pub const SUBJECT_RAW: &str = "subject_raw";
    pub const SUBJECT_NORM: &str = "subject_norm";
    pub const SUBJECT_SOURCE_PATH: &str = "subject_source_path";

    pub const LANGUAGE_CODE: &str = "language_code";
    pub const LANGUAGE_SOURCE_PATH: &str = "language_source_path";

    pub const NOTE_TEXT: &str = "note_text";
    pub const NOTE_SOURCE_PATH: &str = "note_source_path";
}

/// How a [`FilterField`] maps onto the relational schema: the canonical
/// column, the JOIN path from `records` (empty for columns that live on
/// `records` itself), and the MARC source path used when emitting
/// [`crate::model::Evidence`] (spec.md §6.5).
#[derive(Debug, Clone, Copy)]
pub struct FieldContract {
    pub field: FilterField,
    pub table: &'static str,
    pub column: &'static str,
    pub join_path: &'static str,
    pub marc_tag: &'static str,
    pub fts_table: Option<&'static str>,
}

pub static SCHEMA_CONTRACT: Lazy<HashMap<FilterField, FieldContract>> = Lazy::new(|| {
    use table::*;
    let entries = [
        FieldContract {
            field: FilterField::Place,
            table: IMPRINTS,
            column: column::PLACE_NORM,
            join_path: "records JOIN imprints ON imprints.record_id = records.record_id",
            marc_tag: "260$a / 264$a",
            fts_table: None,
        },
        FieldContract {
            field: FilterField::Publisher,
            table: IMPRINTS,
            column: column::PUBLISHER_NORM,
            join_path: "records JOIN imprints ON imprints.record_id = records.record_id",
            marc_tag: "260$b / 264$b",
            fts_table: None,
        },
        FieldContract {
            field: FilterField::DateRange,
            table: IMPRINTS,
            column: column::DATE_START,
            join_path: "records JOIN imprints ON imprints.record_id = records.record_id",
            marc_tag: "260$c / 264$c",
            fts_table: None,
        },
        FieldContract {
            field: FilterField::Agent,
            table: AGENTS,
            column: column::AGENT_NORM,
            join_path: "records JOIN agents ON agents.record_id = records.record_id",
            marc_tag: "100$a / 700$a",
            fts_table: None,
        },
        FieldContract {
            field: FilterField::Language,
            table: LANGUAGES,
            column: column::LANGUAGE_CODE,
            join_path: "records JOIN languages ON languages.record_id = records.record_id",
            marc_tag: "041$a / 008",
            fts_table: None,
        },
        FieldContract {
            field: FilterField::Subject,
            table: SUBJECTS,
            column: column::SUBJECT_NORM,
            join_path: "records JOIN subjects ON subjects.record_id = records.record_id",
            marc_tag: "650$a",
            fts_table: Some(SUBJECTS_FTS),
        },
        FieldContract {
            field: FilterField::Title,
            table: TITLES,
            column: column::TITLE,
            join_path: "records JOIN titles ON titles.record_id = records.record_id",
            marc_tag: "245$a",
            fts_table: Some(TITLES_FTS),
        },
    ];
    entries.into_iter().map(|e| (e.field, e)).collect()
});

pub fn lookup(field: FilterField) -> Result<&'static FieldContract> {
    SCHEMA_CONTRACT
        .get(&field)
        .ok_or_else(|| CoreError::UnknownField(format!("{field:?}")))
}

/// Whether `field` has a full-text column, required for a `CONTAINS` filter.
pub fn is_full_text(field: FilterField) -> Result<bool> {
    Ok(lookup(field)?.fts_table.is_some())
}

/// Evidence columns for a given field, as `(sql_alias, real_column)` pairs.
/// The Plan Compiler projects each real column under `sql_alias`; the
/// Executor reads the row back by that same alias to build an
/// [`crate::model::Evidence`] entry (spec.md §4.4 step 1). Each field's
/// column set differs — imprints fields carry `*_confidence`, agents and
/// subjects don't, languages have no raw/norm split at all — so this is a
/// hand enumeration rather than a derived one.
pub fn evidence_projection(field: FilterField) -> &'static [(&'static str, &'static str)] {
    use column::*;
    match field {
        FilterField::Place => &[
            ("ev_place_raw", PLACE_RAW),
            ("ev_place_norm", PLACE_NORM),
            ("ev_place_confidence", PLACE_CONFIDENCE),
            ("ev_place_source_path", PLACE_SOURCE_PATH),
        ],
        FilterField::Publisher => &[
            ("ev_publisher_raw", PUBLISHER_RAW),
            ("ev_publisher_norm", PUBLISHER_NORM),
            ("ev_publisher_confidence", PUBLISHER_CONFIDENCE),
            ("ev_publisher_source_path", PUBLISHER_SOURCE_PATH),
        ],
        FilterField::DateRange => &[
            ("ev_date_raw", DATE_RAW),
            ("ev_date_start", DATE_START),
            ("ev_date_end", DATE_END),
            ("ev_date_confidence", DATE_CONFIDENCE),
            ("ev_date_source_path", DATE_SOURCE_PATH),
        ],
        FilterField::Agent => &[
            ("ev_agent_raw", AGENT_RAW),
            ("ev_agent_norm", AGENT_NORM),
            ("ev_agent_source_path", AGENT_SOURCE_PATH),
        ],
        FilterField::Subject => &[
            ("ev_subject_raw", SUBJECT_RAW),
            ("ev_subject_norm", SUBJECT_NORM),
            ("ev_subject_source_path", SUBJECT_SOURCE_PATH),
        ],
        FilterField::Language => &[
            ("ev_language_code", LANGUAGE_CODE),
            ("ev_language_source_path", LANGUAGE_SOURCE_PATH),
        ],
        FilterField::Title => &[
            ("ev_title_raw", TITLE_RAW),
            ("ev_title_source_path", TITLE_SOURCE_PATH),
        ],
    }
}

/// Startup introspection check (spec.md §4.2): assert every declared table
/// and column name actually resolves against the live schema's column list
/// for its table. `live_columns` maps table name to the set of column names
/// the DB adapter introspected (e.g. via `PRAGMA table_info`). An internal
/// invariant failure here is fatal at startup, never surfaced to a request.
pub fn assert_contract_matches_live_schema(
    live_columns: &HashMap<String, Vec<String>>,
) -> Result<()> {
    for contract in SCHEMA_CONTRACT.values() {
        let cols = live_columns.get(contract.table).ok_or_else(|| {
            CoreError::SchemaMismatch(format!(
                "Schema Contract references table {:?} which is missing from the live schema",
                contract.table
            ))
        })?;
        if !cols.iter().any(|c| c == contract.column) {
            return Err(CoreError::SchemaMismatch(format!(
                "Schema Contract references column {:?}.{:?} which is missing from the live schema",
                contract.table, contract.column
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_filter_field_has_a_contract_entry() {
        for field in [
            FilterField::Place,
            FilterField::Publisher,
            FilterField::Agent,
            FilterField::DateRange,
            FilterField::Language,
            FilterField::Subject,
            FilterField::Title,
        ] {
            assert!(lookup(field).is_ok(), "missing contract for {field:?}");
        }
    }

    #[test]
    fn only_fts_fields_are_full_text() {
        assert!(is_full_text(FilterField::Title).unwrap());
        assert!(is_full_text(FilterField::Subject).unwrap());
        assert!(!is_full_text(FilterField::Place).unwrap());
    }

    #[test]
    fn live_schema_check_passes_when_columns_present() {
        let mut live = HashMap::new();
        for c in SCHEMA_CONTRACT.values() {
            live.entry(c.table.to_string())
                .or_insert_with(Vec::new)
                .push(c.column.to_string());
        }
        assert!(assert_contract_matches_live_schema(&live).is_ok());
    }

    #[test]
    fn live_schema_check_fails_when_column_missing() {
        let live = HashMap::new();
        assert!(assert_contract_matches_live_schema(&live).is_err());
    }

    #[test]
    fn every_field_has_a_nonempty_evidence_projection() {
        for field in [
            FilterField::Place,
            FilterField::Publisher,
            FilterField::Agent,
            FilterField::DateRange,
            FilterField::Language,
            FilterField::Subject,
            FilterField::Title,
        ] {
            assert!(!evidence_projection(field).is_empty(), "{field:?}");
        }
    }
}
