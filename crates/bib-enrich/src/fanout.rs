//! Single-flight fan-out over the enrichment lookup chain (spec.md §4.7).
//! Mirrors `bib_plan::cache::PlanCache`'s `Mutex<HashMap<Key, Arc<OnceCell<..>>>>`
//! single-flight pattern, keyed here by `(entity_type, normalized_key)`
//! instead of a question string.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, OnceCell};

use bib_core::model::{EnrichmentResult, EntityType};
use bib_core::normalizer::casefold_key;
use bib_core::ports::EnrichmentCacheStore;

use crate::error::Result;
use crate::source::{KnowledgeBaseSource, NAME_SEARCH_ACCEPT_THRESHOLD, SourceHit};

/// Default cache TTL (spec.md §4.7 "Cache policy ... default 30 days").
pub const DEFAULT_TTL_DAYS: i64 = 30;

type Flight = Arc<OnceCell<EnrichmentResult>>;

pub struct Enricher<C, S> {
    cache: C,
    source: S,
    in_flight: Mutex<HashMap<(EntityType, String), Flight>>,
    ttl: Duration,
}

impl<C, S> Enricher<C, S>
where
    C: EnrichmentCacheStore,
    S: KnowledgeBaseSource,
{
    pub fn new(cache: C, source: S) -> Self {
        Self {
            cache,
            source,
            in_flight: Mutex::new(HashMap::new()),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Runs the lookup chain for `(entity_type, entity_value)`, with at most
    /// one concurrent lookup per `(entity_type, normalized_key)` — other
    /// callers for the same key attach to the in-flight result (spec.md
    /// §4.7 "Concurrency"). `authority_id`, when present, is the MARC `$0`
    /// cross-reference value driving the ID-mapping path.
    pub async fn enrich(
        &self,
        entity_type: EntityType,
        entity_value: &str,
        authority_id: Option<&str>,
    ) -> Result<EnrichmentResult> {
        let normalized_key = casefold_key(entity_value).unwrap_or_default();
        let key = (entity_type, normalized_key.clone());

        let flight = {
            let mut guard = self.in_flight.lock().await;
            guard
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let result = flight
            .get_or_init(|| self.resolve(entity_type, entity_value, &normalized_key, authority_id))
            .await
            .clone();

        self.in_flight.lock().await.remove(&key);
        Ok(result)
    }

    /// The actual chain (spec.md §4.7 steps 1-3): cache, then ID mapping,
    /// then name search, landing on a terminal miss if every step comes up
    /// empty. Each source's failure falls through rather than propagating —
    /// only a cache write error would be worth surfacing, and that's logged,
    /// not raised, since a cache-write failure must not blow up a lookup
    /// that otherwise succeeded.
    async fn resolve(
        &self,
        entity_type: EntityType,
        entity_value: &str,
        normalized_key: &str,
        authority_id: Option<&str>,
    ) -> EnrichmentResult {
        let entity_type_str = entity_type_str(entity_type);
        match self.cache.get(entity_type_str, normalized_key).await {
            Ok(Some(cached)) if !cached.is_expired(Utc::now()) => return cached,
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "enrichment cache read failed, falling through"),
        }

        if let Some(authority_id) = authority_id {
            match self.source.lookup_by_authority_id(authority_id).await {
                Ok(Some(hit)) => {
                    let result = self.to_result(
                        entity_type,
                        entity_value,
                        normalized_key,
                        hit,
                        bib_core::model::EnrichmentSource::IdMapping,
                    );
                    self.write_through(&result).await;
                    return result;
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(error = %e, "id-mapping lookup failed, falling through"),
            }
        }

        match self.source.search_by_name(entity_type, entity_value).await {
            Ok(Some(hit)) if hit.confidence >= NAME_SEARCH_ACCEPT_THRESHOLD => {
                let result = self.to_result(
                    entity_type,
                    entity_value,
                    normalized_key,
                    hit,
                    bib_core::model::EnrichmentSource::NameSearch,
                );
                self.write_through(&result).await;
                return result;
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "name search failed"),
        }

        EnrichmentResult::terminal_miss(entity_type, entity_value, normalized_key)
    }

    fn to_result(
        &self,
        entity_type: EntityType,
        entity_value: &str,
        normalized_key: &str,
        hit: SourceHit,
        source: bib_core::model::EnrichmentSource,
    ) -> EnrichmentResult {
        let now = Utc::now();
        EnrichmentResult {
            entity_type,
            entity_value: entity_value.to_string(),
            normalized_key: normalized_key.to_string(),
            wikidata_id: hit.wikidata_id,
            viaf_id: None,
            isni_id: None,
            loc_id: None,
            nli_id: None,
            person_info: hit.person_info,
            place_info: None,
            label: hit.label,
            description: hit.description,
            source,
            confidence: hit.confidence,
            raw: hit.raw,
            fetched_at: now,
            expires_at: now + self.ttl,
        }
    }

    async fn write_through(&self, result: &EnrichmentResult) {
        if let Err(e) = self.cache.put(result).await {
            tracing::warn!(error = %e, "enrichment cache write failed");
        }
    }
}

fn entity_type_str(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Person => "person",
        EntityType::Place => "place",
        EntityType::Publisher => "publisher",
        EntityType::Organization => "organization",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixtureSource;
    use bib_enrich_test_support::InMemoryCache;

    mod bib_enrich_test_support {
        use super::*;
        use async_trait::async_trait;
        use bib_core::ports::Result as PortResult;
        use std::sync::Mutex as StdMutex;

        #[derive(Default)]
        pub struct InMemoryCache {
            store: StdMutex<HashMap<(String, String), EnrichmentResult>>,
        }

        #[async_trait]
        impl EnrichmentCacheStore for InMemoryCache {
            async fn get(&self, entity_type: &str, normalized_key: &str) -> PortResult<Option<EnrichmentResult>> {
                Ok(self
                    .store
                    .lock()
                    .unwrap()
                    .get(&(entity_type.to_string(), normalized_key.to_string()))
                    .cloned())
            }

            async fn put(&self, result: &EnrichmentResult) -> PortResult<()> {
                let key = (entity_type_str(result.entity_type).to_string(), result.normalized_key.clone());
                self.store.lock().unwrap().insert(key, result.clone());
                Ok(())
            }

            async fn reap_expired(&self, now: chrono::DateTime<Utc>) -> PortResult<u64> {
                let mut store = self.store.lock().unwrap();
                let before = store.len();
                store.retain(|_, v| !v.is_expired(now));
                Ok((before - store.len()) as u64)
            }
        }
    }

    fn hit(wikidata_id: &str, confidence: f64) -> SourceHit {
        SourceHit {
            wikidata_id: Some(wikidata_id.into()),
            label: "Victor Hugo".into(),
            description: "French writer".into(),
            confidence,
            person_info: None,
            raw: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn name_search_hit_is_cached_on_write_through() {
        let mut source = FixtureSource::default();
        source.by_name.insert("Hugo, Victor".into(), hit("Q535", 0.9));
        let enricher = Enricher::new(InMemoryCache::default(), source);

        let result = enricher
            .enrich(EntityType::Person, "Hugo, Victor", None)
            .await
            .unwrap();
        assert_eq!(result.wikidata_id, Some("Q535".into()));
        assert_eq!(result.source, bib_core::model::EnrichmentSource::NameSearch);

        let cached = enricher.cache.get("person", "hugo, victor").await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn id_mapping_is_preferred_over_name_search() {
        let mut source = FixtureSource::default();
        source.by_id.insert("VIAF123".into(), hit("Q535", 0.95));
        source.by_name.insert("Hugo, Victor".into(), hit("Q_WRONG", 0.7));
        let enricher = Enricher::new(InMemoryCache::default(), source);

        let result = enricher
            .enrich(EntityType::Person, "Hugo, Victor", Some("VIAF123"))
            .await
            .unwrap();
        assert_eq!(result.wikidata_id, Some("Q535".into()));
        assert_eq!(result.source, bib_core::model::EnrichmentSource::IdMapping);
    }

    #[tokio::test]
    async fn below_threshold_name_search_hit_is_a_terminal_miss() {
        let mut source = FixtureSource::default();
        source.by_name.insert("Obscure, Writer".into(), hit("Q999", 0.1));
        let enricher = Enricher::new(InMemoryCache::default(), source);

        let result = enricher
            .enrich(EntityType::Person, "Obscure, Writer", None)
            .await
            .unwrap();
        assert_eq!(result.source, bib_core::model::EnrichmentSource::None);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn unknown_entity_is_a_terminal_miss() {
        let enricher = Enricher::new(InMemoryCache::default(), FixtureSource::default());
        let result = enricher
            .enrich(EntityType::Person, "Nobody", None)
            .await
            .unwrap();
        assert_eq!(result.source, bib_core::model::EnrichmentSource::None);
    }
}
