use thiserror::Error;

/// Failure model for the Plan Compiler (spec.md §4.3): the external NL step
/// being unreachable, a plan that fails schema/Schema-Contract validation,
/// or a filter field the Schema Contract doesn't know. None of these ever
/// fall back to a keyword heuristic.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("NL service unavailable: {0}")]
    NlUnavailable(String),

    #[error("plan invalid at {path}: {reason}")]
    PlanInvalid { path: String, reason: String },

    #[error("plan unsupported: filter field {0:?} not in the Schema Contract")]
    PlanUnsupported(bib_core::model::FilterField),

    #[error(transparent)]
    Core(#[from] bib_core::CoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PlanError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NlUnavailable(_) => 503,
            Self::PlanInvalid { .. } | Self::PlanUnsupported(_) => 422,
            Self::Core(e) => e.http_status(),
            Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
