//! HTTP error mapping, grounded in `sem_os_server::error::AppError`: one
//! wrapper type, one `IntoResponse` impl, every variant resolved to a status
//! code and a JSON `{"error": ..., "code": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Dialogue(#[from] bib_dialogue::DialogueError),

    #[error(transparent)]
    Core(#[from] bib_core::CoreError),

    #[error("too many requests")]
    RateLimited,

    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Dialogue(e) => (status_from_u16(e.http_status()), dialogue_code(e)),
            Self::Core(e) => (status_from_u16(e.http_status()), "core_error"),
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

fn status_from_u16(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn dialogue_code(e: &bib_dialogue::DialogueError) -> &'static str {
    use bib_dialogue::DialogueError::*;
    match e {
        UnknownSession(_) => "unknown_session",
        InvalidMessage(_) => "invalid_message",
        Plan(_) => "plan_error",
        Exec(_) => "exec_error",
        Agg(_) => "aggregation_error",
        Session(_) => "session_error",
        Db(_) => "database_error",
        Internal(_) => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string(), "code": code }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
