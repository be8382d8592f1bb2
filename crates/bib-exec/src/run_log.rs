//! Run-directory persistence (spec.md §4.4 "Persistence"): every execution
//! writes `plan.json`, `sql.txt`, and `candidate_set.json` under a run-id
//! derived from a UTC timestamp, so a later audit can replay exactly what
//! ran without re-deriving it from logs.

use std::path::{Path, PathBuf};

use bib_core::model::CandidateSet;
use chrono::{DateTime, Utc};

use crate::error::{ExecError, Result};

/// Writes the run directory and returns its path. `runs_root` is typically
/// `runs/` relative to the process's working directory; `now` is injected
/// rather than read internally so callers can make run directories
/// deterministic in tests.
pub async fn persist_run(runs_root: &Path, now: DateTime<Utc>, set: &CandidateSet) -> Result<PathBuf> {
    let run_id = now.format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let dir = runs_root.join(run_id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| ExecError::RunPersistence(e.to_string()))?;

    let plan_json = serde_json::to_string_pretty(&set.query_plan).map_err(|e| anyhow::anyhow!(e))?;
    let candidate_set_json = serde_json::to_string_pretty(set).map_err(|e| anyhow::anyhow!(e))?;

    tokio::fs::write(dir.join("plan.json"), plan_json)
        .await
        .map_err(|e| ExecError::RunPersistence(e.to_string()))?;
    tokio::fs::write(dir.join("sql.txt"), &set.sql_executed)
        .await
        .map_err(|e| ExecError::RunPersistence(e.to_string()))?;
    tokio::fs::write(dir.join("candidate_set.json"), candidate_set_json)
        .await
        .map_err(|e| ExecError::RunPersistence(e.to_string()))?;

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::{QueryPlan, QUERY_PLAN_VERSION};
    use chrono::TimeZone;

    fn sample_set() -> CandidateSet {
        CandidateSet {
            query_text: "books about paris".into(),
            query_plan: QueryPlan {
                version: QUERY_PLAN_VERSION.to_string(),
                intent: "search".into(),
                filters: vec![],
                limit: 10,
                order: None,
            },
            sql_executed: "SELECT 1".into(),
            candidates: vec![],
            total_count: 0,
            truncated: false,
        }
    }

    #[tokio::test]
    async fn writes_all_three_files() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let run_dir = persist_run(dir.path(), now, &sample_set()).await.unwrap();
        for file in ["plan.json", "sql.txt", "candidate_set.json"] {
            assert!(run_dir.join(file).exists(), "missing {file}");
        }
    }
}
