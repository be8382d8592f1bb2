//! Router construction, grounded in `sem_os_server::router::build_router`'s
//! shape: routes declared flat, shared state attached last. There's no
//! protected/public split here the way the teacher has one for JWT — every
//! route here is public, and the chat/ws routes carry their own per-IP
//! rate limiting inside the handler instead of a blanket middleware layer,
//! since only the chat path is rate-limited (spec.md §5).

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/chat", post(handlers::chat::chat))
        .route("/ws/chat", get(handlers::ws::ws_chat))
        .route("/sessions/:id", get(handlers::sessions::get_session))
        .route("/sessions/:id", delete(handlers::sessions::delete_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
