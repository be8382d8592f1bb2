//! Decouples the Dialogue Engine from `bib_enrich::Enricher<C, S>`'s two
//! store/source type parameters — the engine holds an `Arc<dyn EnrichmentPort>`
//! instead of threading those generics through every collaborator.

use async_trait::async_trait;

use bib_core::model::{EnrichmentResult, EntityType};
use bib_core::ports::EnrichmentCacheStore;
use bib_enrich::KnowledgeBaseSource;

#[async_trait]
pub trait EnrichmentPort: Send + Sync {
    async fn enrich(&self, entity_type: EntityType, entity_value: &str, authority_id: Option<&str>) -> EnrichmentResult;
}

#[async_trait]
impl<C, S> EnrichmentPort for bib_enrich::Enricher<C, S>
where
    C: EnrichmentCacheStore + Send + Sync + 'static,
    S: KnowledgeBaseSource + Send + Sync + 'static,
{
    async fn enrich(&self, entity_type: EntityType, entity_value: &str, authority_id: Option<&str>) -> EnrichmentResult {
        self.enrich(entity_type, entity_value, authority_id)
            .await
            .unwrap_or_else(|_| {
                let normalized_key = bib_core::normalizer::casefold_key(entity_value).unwrap_or_default();
                EnrichmentResult::terminal_miss(entity_type, entity_value, &normalized_key)
            })
    }
}

