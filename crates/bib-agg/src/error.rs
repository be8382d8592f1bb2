use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AggError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, AggError>;
