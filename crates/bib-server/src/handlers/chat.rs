//! `POST /chat` (spec.md §6.1). Rate-limited per IP before anything else
//! touches a session lock or the engine, per spec.md §5.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::Json;

use bib_dialogue::wire::{ChatRequest, ChatResponse, ChatResponseBody};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn chat(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    if !state.client_allowed(addr.ip()).await {
        return Err(AppError::RateLimited);
    }

    let session_id = match req.session_id {
        Some(id) => id,
        None => state.engine.create_session().await?,
    };

    let outcome = state.engine.handle_turn(session_id, &req.message).await?;

    Ok(Json(ChatResponse::ok(ChatResponseBody {
        message: outcome.message,
        candidate_set: outcome.candidate_set,
        suggested_followups: outcome.suggested_followups,
        clarification_needed: outcome.clarification_needed,
        session_id: outcome.session_id,
        phase: outcome.phase,
        confidence: outcome.confidence,
    })))
}
