//! Stage A: NL -> QueryPlan. The actual language understanding is an
//! external collaborator (spec.md §4.3, §9 "LLM as dependency"); this module
//! only defines the seam and two implementations of it, mirroring the
//! teacher's `AnthropicClient`/`OpenAiClient` pair behind one trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bib_core::model::QueryPlan;
use bib_core::retry::{classify_status, with_retry, ErrorClass, RetryConfig};

use crate::error::{PlanError, Result};

/// The untyped shape an NL step hands back (spec.md §4.6 step 2a): a
/// candidate plan plus the confidence the Dialogue Engine gates execution
/// on, plus any uncertainties worth surfacing in a clarification turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedPlan {
    pub overall_confidence: f64,
    pub query_plan: QueryPlan,
    #[serde(default)]
    pub uncertainties: Vec<String>,
}

#[async_trait]
pub trait NlPlanClient: Send + Sync {
    async fn propose_plan(&self, question: &str) -> Result<ProposedPlan>;
}

const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

/// Thin `reqwest` wrapper over an Anthropic-compatible Messages API, forcing
/// a tool call whose input schema matches [`ProposedPlan`]. Mirrors the
/// teacher's `AnthropicClient::call_api_with_tool`.
pub struct HttpNlClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl HttpNlClient {
    pub fn new(api_key: String) -> Self {
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string());
        Self {
            api_key,
            client: reqwest::Client::new(),
            model,
        }
    }

    fn tool_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "overall_confidence": {"type": "number"},
                "query_plan": {"type": "object"},
                "uncertainties": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["overall_confidence", "query_plan"]
        })
    }
}

#[async_trait]
impl NlPlanClient for HttpNlClient {
    async fn propose_plan(&self, question: &str) -> Result<ProposedPlan> {
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
                    "system": "Translate the bibliographic question into a QueryPlan tool call.",
                    "messages": [{"role": "user", "content": question}],
                    "tools": [{
                        "name": "propose_query_plan",
                        "description": "Propose a structured QueryPlan for the question",
                        "input_schema": Self::tool_schema(),
                    }],
                    "tool_choice": {"type": "tool", "name": "propose_query_plan"}
                }))
                .send()
                .await
                .map_err(|e| (PlanError::NlUnavailable(e.to_string()), ErrorClass::Retryable))?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                Ok(text)
            } else {
                Err((
                    PlanError::NlUnavailable(format!("{status}: {text}")),
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
            serde_json::from_str(&body).map_err(|e| PlanError::NlUnavailable(e.to_string()))?;

        let input = api_response
            .content
            .into_iter()
            .find(|c| c.block_type == "tool_use")
            .and_then(|c| c.input)
            .ok_or_else(|| PlanError::NlUnavailable("no tool_use block in response".into()))?;

        serde_json::from_value(input).map_err(|e| PlanError::NlUnavailable(e.to_string()))
    }
}

/// Fails closed. Used by the CLI's `query` subcommand when no
/// `ANTHROPIC_API_KEY`/`OPENAI_API_KEY` is configured (spec.md §9: never a
/// silent fallback to a keyword heuristic) and wherever a caller needs an
/// `NlPlanClient` but explicitly wants to disable the NL step.
pub struct FixtureNlClient {
    fixed: Option<ProposedPlan>,
}

impl FixtureNlClient {
    pub fn always_unavailable() -> Self {
        Self { fixed: None }
    }

    #[cfg(any(test, feature = "test-fixtures"))]
    pub fn with_fixed_plan(plan: ProposedPlan) -> Self {
        Self { fixed: Some(plan) }
    }
}

#[async_trait]
impl NlPlanClient for FixtureNlClient {
    async fn propose_plan(&self, _question: &str) -> Result<ProposedPlan> {
        self.fixed
            .clone()
            .ok_or_else(|| PlanError::NlUnavailable("no NL API key configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::QUERY_PLAN_VERSION;

    fn empty_plan() -> QueryPlan {
        QueryPlan {
            version: QUERY_PLAN_VERSION.to_string(),
            intent: "search".into(),
            filters: vec![],
            limit: 50,
            order: None,
        }
    }

    #[tokio::test]
    async fn always_unavailable_fails_closed() {
        let client = FixtureNlClient::always_unavailable();
        let err = client.propose_plan("anything").await.unwrap_err();
        assert!(matches!(err, PlanError::NlUnavailable(_)));
    }

    #[tokio::test]
    async fn fixed_plan_round_trips() {
        let client = FixtureNlClient::with_fixed_plan(ProposedPlan {
            overall_confidence: 0.9,
            query_plan: empty_plan(),
            uncertainties: vec![],
        });
        let proposed = client.propose_plan("anything").await.unwrap();
        assert_eq!(proposed.overall_confidence, 0.9);
    }
}
