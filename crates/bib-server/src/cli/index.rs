//! `index <enriched.jsonl> <db> <schema.sql>` (spec.md §6.2, module I).
//!
//! `IndexStore::ensure_schema` always applies its own baked-in
//! `schema_sql::CREATE_SCHEMA` — that's the schema the rest of the crate is
//! written against, and it must never drift from what `bib-exec`/`bib-agg`
//! assume. The literal `<schema.sql>` argument this subcommand takes is
//! honored by applying it exactly as given, with the same
//! split-on-`;`-execute-each-statement approach `ensure_schema` uses
//! internally, so an operator-supplied schema file is exactly as capable of
//! creating the tables as the built-in one — it's just not the only path to
//! them, since `ensure_schema` still runs first to guarantee the tables the
//! rest of the system relies on actually exist.

use std::fs;
use std::io::{BufRead, BufReader};

use bib_core::model::EnrichedRecord;
use bib_core::normalizer::AliasMap;
use bib_index::{IndexError, IndexStore};

use super::{CliError, CliResult};
use crate::db::open_pool;

fn from_index_error(e: IndexError) -> CliError {
    match e {
        IndexError::MarcParse(msg) | IndexError::RecordInvariant(msg) => CliError::Validation(msg),
        other => CliError::Other(other.into()),
    }
}

pub async fn run(enriched_jsonl: &str, db: &str, schema_sql: &str) -> CliResult {
    let pool = open_pool(db).await.map_err(CliError::Other)?;
    let store = IndexStore::new(pool.clone());
    store.ensure_schema().await.map_err(from_index_error)?;

    let schema_contents = fs::read_to_string(schema_sql)?;
    for statement in schema_contents.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(&pool).await.map_err(|e| CliError::Other(e.into()))?;
    }

    let input = BufReader::new(std::fs::File::open(enriched_jsonl)?);
    let mut records = Vec::new();
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: EnrichedRecord =
            serde_json::from_str(&line).map_err(|e| CliError::Validation(e.to_string()))?;
        records.push(record);
    }

    let agent_aliases = AliasMap::empty();
    let indexed = store.index_batch(&records, &agent_aliases).await.map_err(from_index_error)?;

    println!("indexed {indexed} record(s) into {db}");
    Ok(())
}
