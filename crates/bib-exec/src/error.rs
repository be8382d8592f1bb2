use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Plan(#[from] bib_plan::PlanError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("run directory write failed: {0}")]
    RunPersistence(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ExecError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Plan(e) => e.http_status(),
            Self::Database(_) | Self::RunPersistence(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
