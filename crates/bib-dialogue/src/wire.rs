//! Chat transport wire types (spec.md §6.1). Kept separate from
//! [`crate::engine`]'s internal `TurnOutcome` so the HTTP/WS shape can
//! evolve without perturbing the turn algorithm's return type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bib_core::model::{AggregationResult, Candidate, CandidateSet, EnrichmentResult, Phase};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponseBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate_set: Option<CandidateSet>,
    pub suggested_followups: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarification_needed: Option<bool>,
    pub session_id: Uuid,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<ChatResponseBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn ok(body: ChatResponseBody) -> Self {
        Self { success: true, response: Some(body), error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, response: None, error: Some(message.into()) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database_connected: bool,
    pub session_store_ok: bool,
}

/// Progress frames streamed over `WS /ws/chat` (spec.md §6.1), modeled as a
/// tagged enum so each frame's `type` field round-trips without a separate
/// discriminant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    PhaseChange { phase: Phase },
    CandidateTranche { offset: usize, candidates: Vec<Candidate> },
    AggregationResult { result: AggregationResult },
    EnrichmentProgress { entity_value: String },
    EnrichmentResult { entity_value: String, result: EnrichmentResult },
    Final { response: ChatResponseBody },
}

/// Splits `candidates` into tranches of `tranche_size` (spec.md §6.1
/// "batched candidate tranches of 10"), in order, as `CandidateTranche`
/// frames ready to stream ahead of the `Final` frame.
pub fn candidate_tranches(candidates: &[Candidate], tranche_size: usize) -> Vec<ChatStreamEvent> {
    candidates
        .chunks(tranche_size.max(1))
        .enumerate()
        .map(|(i, chunk)| ChatStreamEvent::CandidateTranche {
            offset: i * tranche_size.max(1),
            candidates: chunk.to_vec(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_event_tags_are_snake_case() {
        let event = ChatStreamEvent::PhaseChange { phase: Phase::CorpusExploration };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_change");
        assert_eq!(json["phase"], "corpus_exploration");
    }

    #[test]
    fn tranches_split_by_ten() {
        let candidates: Vec<Candidate> = (0..25)
            .map(|i| Candidate {
                record_id: format!("mms{i}"),
                title: "t".into(),
                match_rationale: "r".into(),
                evidence: vec![],
            })
            .collect();
        let tranches = candidate_tranches(&candidates, 10);
        assert_eq!(tranches.len(), 3);
        let ChatStreamEvent::CandidateTranche { offset, candidates: last } = &tranches[2] else {
            panic!("expected a tranche");
        };
        assert_eq!(*offset, 20);
        assert_eq!(last.len(), 5);
    }
}
