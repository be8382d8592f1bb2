use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::candidate::CandidateSet;
use super::plan::QueryPlan;

/// Dialogue phase (spec.md §4.6). `QueryDefinition` is where the user is
/// still shaping the question; `CorpusExploration` is entered once a
/// CandidateSet becomes the active subgroup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    QueryDefinition,
    CorpusExploration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub query_plan: Option<QueryPlan>,
    #[serde(default)]
    pub candidate_set: Option<CandidateSet>,
    pub timestamp: DateTime<Utc>,
}

/// The CandidateSet currently under exploration in a session (spec.md
/// GLOSSARY "Active subgroup").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSubgroup {
    pub candidate_set: CandidateSet,
    pub defining_query: String,
    pub filter_summary: String,
    pub created_at: DateTime<Utc>,
}

/// A session sub-entity with no defined consumer contract yet (spec.md §9
/// Open Questions: "user-goals collection ... consumers are nascent").
/// Modeled here as an opaque free-text goal so the Session shape round-trips
/// without committing to a schema nothing downstream reads yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub phase: Phase,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub active_subgroup: Option<ActiveSubgroup>,
    #[serde(default)]
    pub user_goals: Vec<Goal>,
    #[serde(default)]
    pub context: serde_json::Value,
}

impl Session {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            phase: Phase::QueryDefinition,
            messages: Vec::new(),
            active_subgroup: None,
            user_goals: Vec::new(),
            context: serde_json::Value::Null,
        }
    }
}
