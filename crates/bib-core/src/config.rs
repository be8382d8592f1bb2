//! Environment-driven configuration (spec.md §6.4), read once at startup.
//! Mirrors the teacher's `sem_os_server::main` pattern of `expect`-ing
//! required env vars with a descriptive message rather than threading a
//! config-loading `Result` through `main`.

use std::path::PathBuf;

/// Resolved from `BIBLIOGRAPHIC_DB_PATH` / `SESSIONS_DB_PATH`. Reading these
/// lazily (rather than as a `once_cell::sync::Lazy<ServiceConfig>`) keeps
/// tests free to set different paths per-test via `std::env::set_var`.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bibliographic_db_path: PathBuf,
    pub sessions_db_path: PathBuf,
    pub enrichment_db_path: PathBuf,
    pub nl_api_key: Option<String>,
}

impl ServiceConfig {
    /// Loads from the environment. Panics with a descriptive message on a
    /// missing required variable — this is an internal invariant failure
    /// that must never reach a request handler (spec.md §7).
    pub fn from_env() -> Self {
        let bibliographic_db_path = std::env::var("BIBLIOGRAPHIC_DB_PATH")
            .expect("BIBLIOGRAPHIC_DB_PATH must be set")
            .into();
        let sessions_db_path = std::env::var("SESSIONS_DB_PATH")
            .expect("SESSIONS_DB_PATH must be set")
            .into();
        let enrichment_db_path = std::env::var("ENRICHMENT_DB_PATH")
            .unwrap_or_else(|_| "enrichment.db".to_string())
            .into();
        let nl_api_key = std::env::var("ANTHROPIC_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();

        Self {
            bibliographic_db_path,
            sessions_db_path,
            enrichment_db_path,
            nl_api_key,
        }
    }
}
