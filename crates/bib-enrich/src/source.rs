//! The knowledge-base seam (spec.md §4.7 steps 2-3): ID-mapping lookup by
//! authority identifier, and name search with a disambiguation filter. A
//! thin `reqwest` client against Wikidata's public API is the concrete
//! implementation, grounded in the same call shape as `bib_plan::nl::HttpNlClient`.

use async_trait::async_trait;
use serde::Deserialize;

use bib_core::model::{EntityType, PersonInfo};
use bib_core::retry::{classify_status, with_retry, ErrorClass, RetryConfig};

use crate::error::{EnrichError, Result};
use crate::rate_limit::HostRateLimiter;

/// One result candidate from a knowledge-base search, before it's wrapped
/// into a full `EnrichmentResult` with cache TTL metadata.
#[derive(Debug, Clone)]
pub struct SourceHit {
    pub wikidata_id: Option<String>,
    pub label: String,
    pub description: String,
    pub confidence: f64,
    pub person_info: Option<PersonInfo>,
    pub raw: serde_json::Value,
}

/// Minimum match score (spec.md §4.7 step 3 "accept the top result only if a
/// scoring threshold is met").
pub const NAME_SEARCH_ACCEPT_THRESHOLD: f64 = 0.6;

#[async_trait]
pub trait KnowledgeBaseSource: Send + Sync {
    /// Looks up by a national-library authority identifier extracted from
    /// MARC `$0` (spec.md §4.7 step 2). `authority_id` is the cross-reference
    /// value itself (e.g. a VIAF or LoC id), not yet resolved to a universal
    /// entity identifier.
    async fn lookup_by_authority_id(&self, authority_id: &str) -> Result<Option<SourceHit>>;

    /// Name search with a disambiguation filter derived from `entity_type`
    /// (spec.md §4.7 step 3).
    async fn search_by_name(&self, entity_type: EntityType, name: &str) -> Result<Option<SourceHit>>;
}

const WIKIDATA_API_URL: &str = "https://www.wikidata.org/w/api.php";
const WIKIDATA_HOST: &str = "www.wikidata.org";

pub struct WikidataClient {
    client: reqwest::Client,
    rate_limiter: HostRateLimiter,
}

impl WikidataClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            rate_limiter: HostRateLimiter::default(),
        }
    }
}

impl Default for WikidataClient {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct WbSearchResponse {
    search: Vec<WbSearchEntity>,
}

#[derive(Deserialize)]
struct WbSearchEntity {
    id: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    description: String,
}

impl WikidataClient {
    async fn wbsearchentities(&self, search_term: &str) -> Result<WbSearchResponse> {
        self.rate_limiter.wait_turn(WIKIDATA_HOST).await;

        let body = with_retry(RetryConfig::default(), |_attempt| async {
            let response = self
                .client
                .get(WIKIDATA_API_URL)
                .query(&[
                    ("action", "wbsearchentities"),
                    ("search", search_term),
                    ("language", "en"),
                    ("format", "json"),
                ])
                .send()
                .await
                .map_err(|e| (EnrichError::Internal(anyhow::anyhow!(e)), ErrorClass::Retryable))?;

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                Ok(text)
            } else {
                Err((
                    EnrichError::Internal(anyhow::anyhow!("{status}: {text}")),
                    classify_status(status.as_u16()),
                ))
            }
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| EnrichError::Internal(anyhow::anyhow!(e)))
    }
}

#[async_trait]
impl KnowledgeBaseSource for WikidataClient {
    async fn lookup_by_authority_id(&self, authority_id: &str) -> Result<Option<SourceHit>> {
        let body = self.wbsearchentities(authority_id).await?;

        Ok(body.search.into_iter().next().map(|e| SourceHit {
            wikidata_id: Some(e.id),
            label: e.label,
            description: e.description,
            confidence: 0.95,
            person_info: None,
            raw: serde_json::Value::Null,
        }))
    }

    async fn search_by_name(&self, entity_type: EntityType, name: &str) -> Result<Option<SourceHit>> {
        let body = self.wbsearchentities(name).await?;

        // `wbsearchentities` has no `type` filter matching our entity types
        // (its own `type` param only distinguishes Wikidata item/property) —
        // apply the disambiguation filter against each candidate's returned
        // description before accepting a top hit.
        Ok(body
            .search
            .into_iter()
            .find(|e| matches_entity_type(entity_type, &e.description))
            .map(|e| SourceHit {
                wikidata_id: Some(e.id),
                label: e.label,
                description: e.description,
                confidence: 0.7,
                person_info: None,
                raw: serde_json::Value::Null,
            }))
    }
}

/// Keywords expected in a Wikidata search result's short description for
/// each entity type (e.g. "French poet", "commune in France", "publishing
/// company"). Case-insensitive substring match.
fn entity_type_keywords(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Person => &[
            "human", "writer", "author", "poet", "novelist", "philosopher", "politician", "painter", "composer",
        ],
        EntityType::Place => &[
            "city", "town", "village", "commune", "country", "region", "province", "municipality", "department",
        ],
        EntityType::Publisher => &["publisher", "publishing", "printing house", "press"],
        EntityType::Organization => &["organization", "organisation", "company", "institution", "society", "association"],
    }
}

fn matches_entity_type(entity_type: EntityType, description: &str) -> bool {
    let description = description.to_lowercase();
    entity_type_keywords(entity_type).iter().any(|kw| description.contains(kw))
}

/// Fixed-response test double. Never makes a network call.
#[derive(Default)]
pub struct FixtureSource {
    pub by_id: std::collections::HashMap<String, SourceHit>,
    pub by_name: std::collections::HashMap<String, SourceHit>,
}

#[async_trait]
impl KnowledgeBaseSource for FixtureSource {
    async fn lookup_by_authority_id(&self, authority_id: &str) -> Result<Option<SourceHit>> {
        Ok(self.by_id.get(authority_id).cloned())
    }

    async fn search_by_name(&self, _entity_type: EntityType, name: &str) -> Result<Option<SourceHit>> {
        Ok(self.by_name.get(name).cloned())
    }
}
