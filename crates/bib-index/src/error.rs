use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("malformed MARC XML: {0}")]
    MarcParse(String),

    #[error("enriched record invariant violated: {0}")]
    RecordInvariant(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] bib_core::CoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IndexError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MarcParse(_) | Self::RecordInvariant(_) => 422,
            Self::Database(_) | Self::Core(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
