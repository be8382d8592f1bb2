use serde::{Deserialize, Serialize};

/// Normalization confidence constants from spec.md §4.1 and the Open
/// Questions in spec.md §9: heuristic, not calibrated probabilities. Named
/// here so nothing in the codebase hardcodes a bare float literal.
pub mod confidence {
    pub const YEAR_EXACT: f64 = 0.99;
    pub const YEAR_BRACKETED: f64 = 0.95;
    pub const YEAR_RANGE: f64 = 0.90;
    pub const YEAR_EMBEDDED: f64 = 0.85;
    pub const YEAR_CIRCA_PM5: f64 = 0.80;
    pub const UNPARSED_OR_MISSING: f64 = 0.00;

    pub const ALIAS_MAP: f64 = 0.95;
    pub const CASEFOLD_STRIP: f64 = 0.80;
}

/// How a [`NormalizedDate`] was produced. Matches the `method` column of
/// spec.md §4.1's rule table, top to bottom, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMethod {
    YearExact,
    YearBracketed,
    YearCircaPm5,
    YearRange,
    YearEmbedded,
    Unparsed,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedDate {
    pub start: Option<i32>,
    pub end: Option<i32>,
    pub label: String,
    pub confidence: f64,
    pub method: DateMethod,
    pub evidence_paths: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl NormalizedDate {
    /// Invariant from spec.md §3.1: `start <= end` when both non-null.
    pub fn is_valid(&self) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        }
    }
}

/// How a [`NormalizedPlace`]/[`NormalizedPublisher`]/[`NormalizedAgent`] was
/// produced — either an alias-map hit or the casefold/strip fallback
/// (spec.md §4.1 "Place/publisher/agent cleaning").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextNormMethod {
    PlaceAliasMap,
    PlaceCasefoldStrip,
    PublisherAliasMap,
    PublisherCasefoldStrip,
    AgentAliasMap,
    AgentCasefoldStrip,
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPlace {
    pub value: Option<String>,
    pub display: String,
    pub confidence: f64,
    pub method: TextNormMethod,
    pub evidence_paths: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedPublisher {
    pub value: Option<String>,
    pub display: String,
    pub confidence: f64,
    pub method: TextNormMethod,
    pub evidence_paths: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedAgent {
    pub value: Option<String>,
    pub display: String,
    pub confidence: f64,
    pub method: TextNormMethod,
    pub evidence_paths: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}
