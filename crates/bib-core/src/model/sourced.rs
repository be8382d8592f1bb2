use serde::{Deserialize, Serialize};

/// An immutable MARC-derived value paired with its provenance path.
///
/// `source_path` encodes `<field>[<occurrence>]$<subfield>`, e.g. `"500[1]$a"` —
/// the first occurrence of tag 500, subfield a. The raw value is never
/// mutated after ingestion; normalization always produces a *new* value
/// alongside it rather than overwriting this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedValue {
    pub value: String,
    pub source_path: String,
}

impl SourcedValue {
    pub fn new(value: impl Into<String>, source_path: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            source_path: source_path.into(),
        }
    }
}
