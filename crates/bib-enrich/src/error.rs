use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] bib_core::CoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl EnrichError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Database(_) | Self::Core(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, EnrichError>;
