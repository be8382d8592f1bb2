//! `GET /health` — unauthenticated, unrated liveness check (spec.md §6.1).

use axum::extract::State;
use axum::Json;

use bib_dialogue::wire::HealthResponse;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_connected = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();
    let session_store_ok = state.sessions.get(uuid::Uuid::nil()).await.is_ok();

    Json(HealthResponse {
        status: if database_connected { "ok".to_string() } else { "degraded".to_string() },
        database_connected,
        session_store_ok,
    })
}
