//! CLI surface (spec.md §6.2), grounded in `entity-gateway`'s `clap`-derive
//! `main.rs` style: one subcommand per pipeline stage, each a thin wrapper
//! calling straight into the crate that owns that stage.

pub mod index;
pub mod normalize;
pub mod parse;
pub mod query;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bib-server", about = "Bibliographic discovery service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Walks a MARC XML file into canonical JSONL.
    Parse { marc_xml: String, out_jsonl: String },
    /// Normalizes canonical JSONL into enriched JSONL.
    Normalize {
        in_jsonl: String,
        out_jsonl: String,
        #[arg(long = "place-alias")]
        place_alias: Option<String>,
    },
    /// Applies a schema file and indexes enriched JSONL into a database.
    Index { enriched_jsonl: String, db: String, schema_sql: String },
    /// Compiles and runs a natural-language question, printing the run path.
    Query { text: String },
    /// Runs the chat transport (default when no subcommand is given).
    Serve,
}

/// Exit codes per spec.md §6.2: 0 success, 2 validation error, 3 dependency
/// missing, 1 other.
#[derive(Debug)]
pub enum CliError {
    Validation(String),
    DependencyMissing(String),
    Other(anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::DependencyMissing(_) => 3,
            Self::Other(_) => 1,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::DependencyMissing(msg) => write!(f, "dependency missing: {msg}"),
            Self::Other(e) => write!(f, "{e}"),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(e.into())
    }
}

pub type CliResult = Result<(), CliError>;

pub async fn dispatch(command: Command) -> CliResult {
    match command {
        Command::Parse { marc_xml, out_jsonl } => parse::run(&marc_xml, &out_jsonl),
        Command::Normalize { in_jsonl, out_jsonl, place_alias } => {
            normalize::run(&in_jsonl, &out_jsonl, place_alias.as_deref())
        }
        Command::Index { enriched_jsonl, db, schema_sql } => {
            index::run(&enriched_jsonl, &db, &schema_sql).await
        }
        Command::Query { text } => query::run(&text).await,
        Command::Serve => Err(CliError::Other(anyhow::anyhow!(
            "serve is handled by main() directly, not dispatch()"
        ))),
    }
}
