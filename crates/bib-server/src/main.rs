//! bib-server — chat transport, CLI surface, and process wiring for the
//! bibliographic discovery service. Reads config from env vars:
//!   BIBLIOGRAPHIC_DB_PATH — index database path (required)
//!   SESSIONS_DB_PATH      — session store path (required)
//!   ENRICHMENT_DB_PATH    — enrichment cache path (default: enrichment.db)
//!   ANTHROPIC_API_KEY / OPENAI_API_KEY — NL + exploration-classifier credential
//!   BIND_ADDR             — listen address (default: 0.0.0.0:4200)
//!   PLAN_CACHE_PATH       — plan cache JSONL path (default: plan_cache.jsonl)
//!   ENRICHMENT_REAP_INTERVAL_SECS — reaper poll interval (default: 3600)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use bib_core::config::ServiceConfig;
use bib_core::ports::SessionStore;
use bib_dialogue::{DialogueEngine, EnrichmentPort, ExplorationClassifier, FixtureExplorationClassifier, HttpExplorationClassifier};
use bib_enrich::{Enricher, SqliteEnrichmentCacheStore, WikidataClient};
use bib_plan::nl::{FixtureNlClient, HttpNlClient, NlPlanClient};
use bib_plan::PlanCache;
use bib_server::cli::{self, Cli, Command};
use bib_server::db::open_pool;
use bib_server::rate_limit::ChatRateLimiter;
use bib_server::router::build_router;
use bib_server::state::AppState;
use bib_sessions::SqliteSessionStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,bib_server=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        None | Some(Command::Serve) => serve().await,
        Some(command) => {
            let exit_code = match cli::dispatch(command).await {
                Ok(()) => 0,
                Err(e) => {
                    tracing::error!("{e}");
                    e.exit_code()
                }
            };
            std::process::exit(exit_code);
        }
    }
}

async fn serve() {
    let config = ServiceConfig::from_env();

    let index_pool = open_pool(&config.bibliographic_db_path.to_string_lossy())
        .await
        .expect("failed to open bibliographic database");
    let sessions_pool = open_pool(&config.sessions_db_path.to_string_lossy())
        .await
        .expect("failed to open sessions database");
    let enrichment_pool = open_pool(&config.enrichment_db_path.to_string_lossy())
        .await
        .expect("failed to open enrichment database");

    bib_index::IndexStore::new(index_pool.clone())
        .ensure_schema()
        .await
        .expect("failed to apply bibliographic schema");
    let session_store = SqliteSessionStore::new(sessions_pool.clone());
    session_store.ensure_schema().await.expect("failed to apply session schema");
    let enrichment_store = SqliteEnrichmentCacheStore::new(enrichment_pool.clone());
    enrichment_store.ensure_schema().await.expect("failed to apply enrichment schema");

    let nl: Arc<dyn NlPlanClient> = match config.nl_api_key.clone() {
        Some(key) => Arc::new(HttpNlClient::new(key)),
        None => {
            tracing::warn!("no NL API key configured — plan compilation will fail closed");
            Arc::new(FixtureNlClient::always_unavailable())
        }
    };
    let exploration: Arc<dyn ExplorationClassifier> = match config.nl_api_key.clone() {
        Some(key) => Arc::new(HttpExplorationClassifier::new(key)),
        None => Arc::new(FixtureExplorationClassifier::always_unavailable()),
    };

    let plan_cache_path =
        std::env::var("PLAN_CACHE_PATH").unwrap_or_else(|_| "plan_cache.jsonl".to_string());
    let plan_cache_store = bib_plan::FilePlanCacheStore::open(plan_cache_path)
        .await
        .expect("failed to open plan cache");
    let plan_cache = Arc::new(PlanCache::new(plan_cache_store));

    let sessions: Arc<dyn SessionStore> = Arc::new(session_store);

    let enricher_for_turns = Enricher::new(SqliteEnrichmentCacheStore::new(enrichment_pool.clone()), WikidataClient::new());
    let enrichment: Arc<dyn EnrichmentPort> = Arc::new(enricher_for_turns);

    let engine = Arc::new(DialogueEngine::new(nl, plan_cache, exploration, sessions.clone(), index_pool.clone(), enrichment));

    let reap_interval_secs: u64 = std::env::var("ENRICHMENT_REAP_INTERVAL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3600);
    let reaper_store = SqliteEnrichmentCacheStore::new(enrichment_pool.clone());
    tokio::spawn(async move {
        bib_enrich::run_reaper(reaper_store, Duration::from_secs(reap_interval_secs)).await;
    });
    tracing::info!("enrichment cache reaper spawned (interval={reap_interval_secs}s)");

    let state = AppState {
        engine,
        sessions,
        pool: index_pool,
        rate_limiter: Arc::new(ChatRateLimiter::default()),
    };

    let app = build_router(state);

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4200".to_string());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {bind_addr}: {e}"));
    tracing::info!("bib-server listening on {bind_addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server error");
}
