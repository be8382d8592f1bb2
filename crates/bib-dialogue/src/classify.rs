//! Stage 3a of the turn algorithm (spec.md §4.6): classifying a
//! `CorpusExploration`-phase turn into exactly one of seven exploration
//! intents. Mirrors `bib_plan::nl::NlPlanClient` — a thin `reqwest`
//! implementation forcing a tool call, plus a fixture for tests — since
//! this is the same kind of external-NL seam, just with a different output
//! shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bib_core::model::{Filter, QueryPlan};
use bib_core::retry::{classify_status, with_retry, ErrorClass, RetryConfig};

use crate::error::{DialogueError, Result};

/// The closed set of exploration intents (spec.md §4.6 step 3a).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationIntent {
    NewQuery,
    Refinement,
    Aggregation,
    MetadataQuestion,
    EnrichmentRequest,
    Recommendation,
    Comparison,
}

/// What the classifier hands back for a `CorpusExploration` turn: which
/// branch to take, plus whatever extra detail that branch needs. Kept as
/// one struct with optional fields (rather than an enum carrying each
/// intent's payload) because the NL step has to fill it from one forced
/// tool call — an enum would need its own tagged schema per variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationAction {
    pub intent: ExplorationIntent,
    /// Present for `Refinement`: the additional filters to AND-merge into
    /// the active plan.
    #[serde(default)]
    pub refinement_filters: Vec<Filter>,
    /// Present for `Aggregation`: which template to run (spec.md §4.5).
    #[serde(default)]
    pub aggregation_intent: Option<bib_core::model::AggregationIntent>,
    #[serde(default)]
    pub date_bucket: Option<bib_core::model::DateBucket>,
    /// Present for `EnrichmentRequest`: the named entity and its type.
    #[serde(default)]
    pub enrichment_entity_type: Option<bib_core::model::EntityType>,
    #[serde(default)]
    pub enrichment_entity_value: Option<String>,
    #[serde(default)]
    pub enrichment_authority_id: Option<String>,
}

#[async_trait]
pub trait ExplorationClassifier: Send + Sync {
    async fn classify(&self, message: &str, active_plan: &QueryPlan) -> Result<ExplorationAction>;
}

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Thin `reqwest` wrapper forcing a tool call whose input schema matches
/// [`ExplorationAction`], mirroring `bib_plan::nl::HttpNlClient`.
pub struct HttpExplorationClassifier {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl HttpExplorationClassifier {
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());
        Self { api_key, client: reqwest::Client::new(), model }
    }

    fn tool_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "intent": {
                    "type": "string",
                    "enum": ["new_query", "refinement", "aggregation", "metadata_question",
                             "enrichment_request", "recommendation", "comparison"]
                },
                "refinement_filters": {"type": "array", "items": {"type": "object"}},
                "aggregation_intent": {"type": "string"},
                "date_bucket": {"type": "string"},
                "enrichment_entity_type": {"type": "string"},
                "enrichment_entity_value": {"type": "string"},
                "enrichment_authority_id": {"type": "string"}
            },
            "required": ["intent"]
        })
    }
}

#[async_trait]
impl ExplorationClassifier for HttpExplorationClassifier {
    async fn classify(&self, message: &str, active_plan: &QueryPlan) -> Result<ExplorationAction> {
        let active_plan_json =
            serde_json::to_string(active_plan).map_err(|e| DialogueError::Internal(anyhow::anyhow!(e)))?;
        let prompt = format!("Active plan: {active_plan_json}\nUser message: {message}");

        let body = with_retry(RetryConfig::default(), |_attempt| async {
            let response = self
                .client
                .post(ANTHROPIC_MESSAGES_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("content-type", "application/json")
                .json(&serde_json::json!({
                    "model": &self.model,
                    "max_tokens": 2048,
                    "system": "Classify the corpus-exploration turn into one exploration intent.",
                    "messages": [{"role": "user", "content": &prompt}],
                    "tools": [{
                        "name": "classify_exploration_turn",
                        "description": "Classify the turn and supply the detail its branch needs",
                        "input_schema": Self::tool_schema(),
                    }],
                    "tool_choice": {"type": "tool", "name": "classify_exploration_turn"}
                }))
                .send()
                .await
                .map_err(|e| (DialogueError::Internal(anyhow::anyhow!(e)), ErrorClass::Retryable))?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                Ok(text)
            } else {
                Err((
                    DialogueError::Internal(anyhow::anyhow!("{status}: {text}")),
                    classify_status(status.as_u16()),
                ))
            }
        })
        .await?;

        #[derive(Deserialize)]
        struct ContentBlock {
            #[serde(rename = "type")]
            block_type: String,
            input: Option<serde_json::Value>,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            content: Vec<ContentBlock>,
        }

        let api_response: ApiResponse =
            serde_json::from_str(&body).map_err(|e| DialogueError::Internal(anyhow::anyhow!(e)))?;

        let input = api_response
            .content
            .into_iter()
            .find(|c| c.block_type == "tool_use")
            .and_then(|c| c.input)
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!("no tool_use block in response")))?;

        serde_json::from_value(input).map_err(|e| DialogueError::Internal(anyhow::anyhow!(e)))
    }
}

/// Fixed-response test double, and what the CLI falls back to when no NL key
/// is configured — there is no keyword heuristic here either (spec.md §9).
pub struct FixtureExplorationClassifier {
    fixed: Option<ExplorationAction>,
}

impl FixtureExplorationClassifier {
    pub fn always_unavailable() -> Self {
        Self { fixed: None }
    }

    pub fn with_fixed_action(action: ExplorationAction) -> Self {
        Self { fixed: Some(action) }
    }
}

#[async_trait]
impl ExplorationClassifier for FixtureExplorationClassifier {
    async fn classify(&self, _message: &str, _active_plan: &QueryPlan) -> Result<ExplorationAction> {
        self.fixed
            .clone()
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!("no exploration classifier configured")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_unavailable_fails_closed() {
        let classifier = FixtureExplorationClassifier::always_unavailable();
        let plan = QueryPlan {
            version: bib_core::model::QUERY_PLAN_VERSION.to_string(),
            intent: "search".into(),
            filters: vec![],
            limit: 50,
            order: None,
        };
        assert!(classifier.classify("anything", &plan).await.is_err());
    }

    #[tokio::test]
    async fn fixed_action_round_trips() {
        let classifier = FixtureExplorationClassifier::with_fixed_action(ExplorationAction {
            intent: ExplorationIntent::MetadataQuestion,
            refinement_filters: vec![],
            aggregation_intent: None,
            date_bucket: None,
            enrichment_entity_type: None,
            enrichment_entity_value: None,
            enrichment_authority_id: None,
        });
        let plan = QueryPlan {
            version: bib_core::model::QUERY_PLAN_VERSION.to_string(),
            intent: "search".into(),
            filters: vec![],
            limit: 50,
            order: None,
        };
        let action = classifier.classify("how many books", &plan).await.unwrap();
        assert_eq!(action.intent, ExplorationIntent::MetadataQuestion);
    }
}
