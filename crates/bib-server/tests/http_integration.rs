//! HTTP-level integration tests, grounded in
//! `sem_os_server::tests::authoring_http_integration`'s build-a-test-app +
//! `tower::ServiceExt::oneshot` shape — but against an in-memory SQLite
//! database instead of a DATABASE_URL-configured Postgres, since that's
//! what this service actually runs on.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use sqlx::SqlitePool;
use tower::ServiceExt;

use bib_core::model::{QueryPlan, QUERY_PLAN_VERSION};
use bib_core::ports::SessionStore;
use bib_dialogue::classify::FixtureExplorationClassifier;
use bib_dialogue::DialogueEngine;
use bib_enrich::source::FixtureSource;
use bib_enrich::{Enricher, SqliteEnrichmentCacheStore};
use bib_plan::nl::{FixtureNlClient, ProposedPlan};
use bib_plan::{FilePlanCacheStore, PlanCache};
use bib_server::rate_limit::ChatRateLimiter;
use bib_server::router::build_router;
use bib_server::state::AppState;
use bib_sessions::SqliteSessionStore;

fn empty_plan() -> QueryPlan {
    QueryPlan {
        version: QUERY_PLAN_VERSION.to_string(),
        intent: "search".into(),
        filters: vec![],
        limit: 50,
        order: None,
    }
}

async fn build_test_app() -> axum::Router {
    let index_pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    bib_index::IndexStore::new(index_pool.clone()).ensure_schema().await.unwrap();

    let sessions_pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let session_store = SqliteSessionStore::new(sessions_pool);
    session_store.ensure_schema().await.unwrap();

    let enrichment_pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let enrichment_store = SqliteEnrichmentCacheStore::new(enrichment_pool);
    enrichment_store.ensure_schema().await.unwrap();

    let nl = Arc::new(FixtureNlClient::with_fixed_plan(ProposedPlan {
        overall_confidence: 0.95,
        query_plan: empty_plan(),
        uncertainties: vec![],
    }));
    let exploration = Arc::new(FixtureExplorationClassifier::always_unavailable());
    let cache_path = std::env::temp_dir().join(format!("bib-server-test-{}.jsonl", uuid::Uuid::new_v4()));
    let cache_store = FilePlanCacheStore::open(cache_path).await.unwrap();
    let plan_cache = Arc::new(PlanCache::new(cache_store));
    let sessions: Arc<dyn SessionStore> = Arc::new(session_store);
    let enrichment = Arc::new(Enricher::new(enrichment_store, FixtureSource::default()));

    let engine = Arc::new(DialogueEngine::new(
        nl,
        plan_cache,
        exploration,
        sessions.clone(),
        index_pool.clone(),
        enrichment,
    ));

    let state = AppState {
        engine,
        sessions,
        pool: index_pool,
        rate_limiter: Arc::new(ChatRateLimiter::new(10, 10)),
    };

    build_router(state)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = build_test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database_connected"], true);
}

#[tokio::test]
async fn chat_creates_a_session_and_executes_a_search() {
    let app = build_test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header("content-type", "application/json")
        .extension(test_connect_info())
        .body(Body::from(r#"{"message": "old books"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["response"]["phase"], "corpus_exploration");
}

#[tokio::test]
async fn unknown_session_returns_404() {
    let app = build_test_app().await;
    let missing = uuid::Uuid::new_v4();
    let request = Request::builder()
        .method("GET")
        .uri(format!("/sessions/{missing}"))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn test_connect_info() -> axum::extract::ConnectInfo<SocketAddr> {
    axum::extract::ConnectInfo("127.0.0.1:9999".parse().unwrap())
}
