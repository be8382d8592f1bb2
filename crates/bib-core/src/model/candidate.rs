use serde::{Deserialize, Serialize};

use super::plan::QueryPlan;

/// A triple pointing from a candidate back to the MARC field and the DB
/// column that caused inclusion (spec.md GLOSSARY).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub field_path: String,
    pub db_column: String,
    pub value: String,
    #[serde(default)]
    pub normalized_value: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub record_id: String,
    pub title: String,
    pub match_rationale: String,
    pub evidence: Vec<Evidence>,
}

/// The authoritative answer shape: record ids plus per-record evidence plus
/// the exact SQL and plan that produced them (spec.md GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSet {
    pub query_text: String,
    pub query_plan: QueryPlan,
    pub sql_executed: String,
    pub candidates: Vec<Candidate>,
    pub total_count: i64,
    pub truncated: bool,
}
