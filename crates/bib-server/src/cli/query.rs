//! `query "<text>"` (spec.md §6.2, modules P + E) — proposes a plan,
//! executes it, persists the run, and prints the run's path. Unlike the
//! chat turn algorithm this bypasses the confidence gate and the plan
//! cache entirely: it's a one-shot operator tool, not a dialogue turn.

use std::path::PathBuf;

use bib_core::config::ServiceConfig;
use bib_plan::nl::{HttpNlClient, NlPlanClient};
use bib_plan::PlanError;

use super::{CliError, CliResult};
use crate::db::open_pool;

pub async fn run(text: &str) -> CliResult {
    let config = ServiceConfig::from_env();
    let api_key = config
        .nl_api_key
        .ok_or_else(|| CliError::DependencyMissing("no NL API key configured (ANTHROPIC_API_KEY/OPENAI_API_KEY)".into()))?;

    let client = HttpNlClient::new(api_key);
    let proposed = client.propose_plan(text).await.map_err(|e| match e {
        PlanError::NlUnavailable(msg) => CliError::DependencyMissing(msg),
        PlanError::PlanInvalid { path, reason } => CliError::Validation(format!("{path}: {reason}")),
        PlanError::PlanUnsupported(field) => CliError::Validation(format!("unsupported filter field {field:?}")),
        other => CliError::Other(other.into()),
    })?;

    let db_path = config.bibliographic_db_path.to_string_lossy().into_owned();
    let pool = open_pool(&db_path).await.map_err(CliError::Other)?;
    let candidate_set = bib_exec::execute(&pool, &proposed.query_plan, text)
        .await
        .map_err(|e| CliError::Other(e.into()))?;

    let run_path = bib_exec::persist_run(&PathBuf::from("runs"), chrono::Utc::now(), &candidate_set)
        .await
        .map_err(|e| CliError::Other(e.into()))?;

    println!("{}", run_path.display());
    Ok(())
}
