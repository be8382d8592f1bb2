use serde::{Deserialize, Serialize};

use super::normalized::{NormalizedDate, NormalizedPlace, NormalizedPublisher};
use super::sourced::SourcedValue;

/// One MARC imprint statement (raw, pre-normalization).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imprint {
    pub place: SourcedValue,
    pub publisher: SourcedValue,
    pub date: SourcedValue,
}

/// One MARC agent (author/contributor) statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub name: SourcedValue,
    #[serde(default)]
    pub role: Option<SourcedValue>,
}

/// One MARC subject heading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub heading: SourcedValue,
}

/// One MARC language code/note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub code: SourcedValue,
}

/// One MARC general note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub text: SourcedValue,
}

/// A bibliographic record as produced by the MARC field walker, before
/// normalization. Every leaf holding a MARC value is a [`SourcedValue`];
/// array order mirrors MARC occurrence order and is load-bearing for
/// `imprints_norm[i]` alignment in [`EnrichedRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub mms_id: String,
    pub source_file: String,
    pub jsonl_line_number: u64,

    pub title: SourcedValue,
    #[serde(default)]
    pub imprints: Vec<Imprint>,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(default)]
    pub languages: Vec<Language>,
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// Per-imprint normalized fields, index-aligned with `imprints[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImprintNorm {
    pub date_norm: NormalizedDate,
    pub place_norm: NormalizedPlace,
    pub publisher_norm: NormalizedPublisher,
}

/// The `m2` object added during normalization. Carries no data that
/// overwrites the M1 `CanonicalRecord` — see [`EnrichedRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct M2 {
    pub imprints_norm: Vec<ImprintNorm>,
}

/// `CanonicalRecord` plus its `m2` normalization object. Per spec.md §6.3,
/// enriched JSONL is canonical JSONL with `m2` added and *no other field
/// renamed, removed, or reordered* — so this type flattens `CanonicalRecord`
/// via `#[serde(flatten)]` rather than nesting it under a new key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: CanonicalRecord,
    pub m2: M2,
}

impl EnrichedRecord {
    /// Invariant from spec.md §3.1: array indices of `imprints_norm` match
    /// `imprints`. Violating this is an internal invariant failure, not a
    /// recoverable validation error — callers should treat `false` as a
    /// reason to refuse indexing the record.
    pub fn imprints_aligned(&self) -> bool {
        self.record.imprints.len() == self.m2.imprints_norm.len()
    }
}
