use thiserror::Error;

/// Failure model for a dialogue turn (spec.md §4.6, §7). Every variant maps
/// to one of the status codes spec.md §6.1 names for `POST /chat`.
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("unknown session {0}")]
    UnknownSession(uuid::Uuid),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Plan(#[from] bib_plan::PlanError),

    #[error(transparent)]
    Exec(#[from] bib_exec::ExecError),

    #[error(transparent)]
    Agg(#[from] bib_agg::AggError),

    #[error(transparent)]
    Session(#[from] bib_core::CoreError),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DialogueError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnknownSession(_) => 404,
            Self::InvalidMessage(_) => 400,
            Self::Plan(e) => e.http_status(),
            Self::Exec(e) => e.http_status(),
            Self::Agg(e) => e.http_status(),
            Self::Session(e) => e.http_status(),
            Self::Db(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, DialogueError>;
