//! Shared state handed to every handler via `Extension`, mirroring
//! `sem_os_server::main`'s `Arc<dyn CoreService>` wiring: one `Arc` per
//! collaborator the handlers need directly, plus the engine itself.

use std::net::IpAddr;
use std::sync::Arc;

use bib_core::ports::SessionStore;
use bib_dialogue::DialogueEngine;
use bib_plan::FilePlanCacheStore;
use sqlx::SqlitePool;

use crate::rate_limit::ChatRateLimiter;

/// The engine is generic over its plan-cache store; the server always runs
/// against the disk-backed, append-only store (spec.md §6.4's "plan cache
/// read once on process start").
pub type Engine = DialogueEngine<FilePlanCacheStore>;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub sessions: Arc<dyn SessionStore>,
    pub pool: SqlitePool,
    pub rate_limiter: Arc<ChatRateLimiter>,
}

impl AppState {
    pub async fn client_allowed(&self, ip: IpAddr) -> bool {
        self.rate_limiter.try_acquire(ip).await
    }
}
