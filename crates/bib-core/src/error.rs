use thiserror::Error;

/// Error taxonomy shared by the normalizer, indexer, and Schema Contract.
/// Mirrors the 4-way split in spec.md §7: validation, dependency-unavailable,
/// data-quality (carried as warnings, never an `Err`), and internal-invariant.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("unknown filter field: {0}")]
    UnknownField(String),

    #[error("schema contract mismatch: {0}")]
    SchemaMismatch(String),

    #[error("alias map invalid: {0}")]
    InvalidAliasMap(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed enriched jsonl at line {line}: {source}")]
    MalformedJsonl {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    /// HTTP status this error would map to if it ever escaped to a transport
    /// boundary. Schema/internal-invariant errors never should (spec.md §7) —
    /// they're fatal at startup — but the mapping exists for completeness and
    /// for the rare case a validation error surfaces from a CLI exit code.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::UnknownField(_) | Self::InvalidAliasMap(_) => 422,
            Self::MalformedJsonl { .. } => 400,
            Self::SchemaMismatch(_) => 500,
            Self::Io(_) | Self::Internal(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
