use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("session {0} not found")]
    NotFound(uuid::Uuid),

    #[error(transparent)]
    Core(#[from] bib_core::CoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SessionStoreError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Database(_) | Self::Core(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionStoreError>;
