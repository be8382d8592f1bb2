//! `GET /sessions/:id`, `DELETE /sessions/:id` (spec.md §6.1) — direct
//! Session Store access, bypassing the dialogue engine entirely since
//! neither operation is a turn.

use axum::extract::{Path, State};
use axum::Json;
use bib_core::model::Session;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Session>> {
    let session = state.sessions.get(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(session))
}

pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<serde_json::Value>> {
    state.sessions.delete(id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
