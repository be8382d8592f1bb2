//! The turn algorithm (spec.md §4.6). One [`DialogueEngine::handle_turn`]
//! call is one turn: load session, dispatch on phase, persist, release the
//! per-session lock. Every external I/O boundary inside a turn — the NL
//! call, the DB query, the enrichment fetch — is a plain `.await` on a
//! future the caller's task can cancel; on cancellation nothing here has
//! written to the session yet, since `sessions.save` is always the last
//! step.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use bib_core::model::{ActiveSubgroup, Filter, FilterField, FilterValue, Message, MessageRole, Phase, QueryPlan, Session};
use bib_core::ports::SessionStore;
use bib_plan::nl::NlPlanClient;
use bib_plan::PlanCache;

use crate::classify::{ExplorationAction, ExplorationClassifier, ExplorationIntent};
use crate::confidence::CONFIDENCE_GATE;
use crate::enrichment_port::EnrichmentPort;
use crate::error::{DialogueError, Result};
use crate::locks::SessionLocks;
use crate::metadata;
use bib_core::ports::PlanCacheStore;

/// What one turn produces, independent of how it gets rendered onto the
/// wire (see `crate::wire::ChatResponseBody`).
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub session_id: Uuid,
    pub phase: Phase,
    pub message: String,
    pub candidate_set: Option<bib_core::model::CandidateSet>,
    pub clarification_needed: Option<bool>,
    pub confidence: Option<f64>,
    pub aggregation: Option<bib_core::model::AggregationResult>,
    pub enrichment: Option<bib_core::model::EnrichmentResult>,
    pub suggested_followups: Vec<String>,
}

pub struct DialogueEngine<S: PlanCacheStore> {
    nl: Arc<dyn NlPlanClient>,
    plan_cache: Arc<PlanCache<S>>,
    exploration: Arc<dyn ExplorationClassifier>,
    sessions: Arc<dyn SessionStore>,
    pool: SqlitePool,
    enrichment: Arc<dyn EnrichmentPort>,
    locks: SessionLocks,
}

impl<S: PlanCacheStore> DialogueEngine<S> {
    pub fn new(
        nl: Arc<dyn NlPlanClient>,
        plan_cache: Arc<PlanCache<S>>,
        exploration: Arc<dyn ExplorationClassifier>,
        sessions: Arc<dyn SessionStore>,
        pool: SqlitePool,
        enrichment: Arc<dyn EnrichmentPort>,
    ) -> Self {
        Self {
            nl,
            plan_cache,
            exploration,
            sessions,
            pool,
            enrichment,
            locks: SessionLocks::new(),
        }
    }

    pub async fn create_session(&self) -> Result<Uuid> {
        let session = Session::new(Uuid::new_v4());
        self.sessions.create(&session).await?;
        Ok(session.id)
    }

    /// Runs one turn end to end (spec.md §4.6 steps 1-3), serialized against
    /// any other turn for the same session.
    pub async fn handle_turn(&self, session_id: Uuid, message: &str) -> Result<TurnOutcome> {
        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or(DialogueError::UnknownSession(session_id))?;

        if message.trim().is_empty() {
            return Err(DialogueError::InvalidMessage("message must not be empty".into()));
        }

        let outcome = match session.phase {
            Phase::QueryDefinition => self.handle_query_definition(&mut session, message).await?,
            Phase::CorpusExploration => self.handle_corpus_exploration(&mut session, message).await?,
        };

        session.updated_at = Utc::now();
        self.sessions.save(&session).await?;
        Ok(outcome)
    }

    /// Step 2: propose a plan, gate on confidence, execute or clarify. A
    /// cache hit means this exact question text previously cleared the gate
    /// (only confident plans are ever written to the cache), so it's safe
    /// to execute immediately without a second NL call.
    async fn handle_query_definition(&self, session: &mut Session, message: &str) -> Result<TurnOutcome> {
        push_user_message(session, message);

        if let Some(cached) = self.plan_cache.peek(message).await? {
            return self.execute_plan(session, message, cached.query_plan, 1.0).await;
        }

        let proposed = self.nl.propose_plan(message).await?;

        if proposed.overall_confidence < CONFIDENCE_GATE {
            let clarification = "Could you clarify what you're looking for? \
                I wasn't confident enough in my reading of that to run a search.";
            push_assistant_message(session, clarification, None, None);
            return Ok(TurnOutcome {
                session_id: session.id,
                phase: session.phase,
                message: clarification.to_string(),
                candidate_set: None,
                clarification_needed: Some(true),
                confidence: Some(proposed.overall_confidence),
                aggregation: None,
                enrichment: None,
                suggested_followups: vec![],
            });
        }

        let mut query_plan = proposed.query_plan;
        normalize_language_filters(&mut query_plan);
        self.plan_cache
            .get_or_compile(message, || async {
                Ok(bib_core::ports::CachedPlan { query_plan: query_plan.clone(), model_id: "dialogue".to_string() })
            })
            .await?;

        self.execute_plan(session, message, query_plan, proposed.overall_confidence).await
    }

    async fn execute_plan(
        &self,
        session: &mut Session,
        message: &str,
        query_plan: QueryPlan,
        confidence: f64,
    ) -> Result<TurnOutcome> {
        let candidate_set = bib_exec::execute(&self.pool, &query_plan, message).await?;
        self.enter_corpus_exploration(session, message, &query_plan, candidate_set.clone());

        let reply = format!(
            "Found {} matching record(s){}.",
            candidate_set.total_count,
            if candidate_set.truncated { " (showing the first page)" } else { "" }
        );
        push_assistant_message(session, &reply, Some(query_plan), Some(candidate_set.clone()));

        Ok(TurnOutcome {
            session_id: session.id,
            phase: session.phase,
            message: reply,
            candidate_set: Some(candidate_set),
            clarification_needed: Some(false),
            confidence: Some(confidence),
            aggregation: None,
            enrichment: None,
            suggested_followups: vec![],
        })
    }

    /// Step 3: classify the exploration turn and dispatch.
    async fn handle_corpus_exploration(&self, session: &mut Session, message: &str) -> Result<TurnOutcome> {
        push_user_message(session, message);

        let active_plan = session
            .active_subgroup
            .as_ref()
            .map(|s| s.candidate_set.query_plan.clone())
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!(
                "CorpusExploration phase with no active_subgroup"
            )))?;

        let action = self.exploration.classify(message, &active_plan).await?;

        match action.intent {
            ExplorationIntent::NewQuery => {
                session.phase = Phase::QueryDefinition;
                session.active_subgroup = None;
                self.handle_query_definition(session, message).await
            }
            ExplorationIntent::Refinement => self.handle_refinement(session, message, &action).await,
            ExplorationIntent::Aggregation => self.handle_aggregation(session, message, &action).await,
            ExplorationIntent::MetadataQuestion => self.handle_metadata_question(session, message).await,
            ExplorationIntent::EnrichmentRequest => self.handle_enrichment_request(session, message, &action).await,
            ExplorationIntent::Recommendation | ExplorationIntent::Comparison => {
                let reply = "I can't act on that kind of request yet — I can search, refine, \
                    aggregate, answer questions about the current results, or look up an entity.";
                push_assistant_message(session, reply, None, None);
                Ok(TurnOutcome {
                    session_id: session.id,
                    phase: session.phase,
                    message: reply.to_string(),
                    candidate_set: None,
                    clarification_needed: None,
                    confidence: None,
                    aggregation: None,
                    enrichment: None,
                    suggested_followups: vec![],
                })
            }
        }
    }

    async fn handle_refinement(
        &self,
        session: &mut Session,
        message: &str,
        action: &ExplorationAction,
    ) -> Result<TurnOutcome> {
        let active = session
            .active_subgroup
            .as_ref()
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!("refinement with no active subgroup")))?;

        let mut merged_plan = active.candidate_set.query_plan.clone();
        for filter in &action.refinement_filters {
            if !merged_plan.filters.iter().any(|existing| existing.field == filter.field && existing.op == filter.op) {
                let mut filter = filter.clone();
                normalize_language_filter(&mut filter);
                merged_plan.filters.push(filter);
            }
        }
        merged_plan.validate_shape().map_err(DialogueError::Session)?;

        let candidate_set = bib_exec::execute(&self.pool, &merged_plan, message).await?;
        self.enter_corpus_exploration(session, message, &merged_plan, candidate_set.clone());

        let reply = format!("Refined to {} matching record(s).", candidate_set.total_count);
        push_assistant_message(session, &reply, Some(merged_plan), Some(candidate_set.clone()));

        Ok(TurnOutcome {
            session_id: session.id,
            phase: session.phase,
            message: reply,
            candidate_set: Some(candidate_set),
            clarification_needed: None,
            confidence: None,
            aggregation: None,
            enrichment: None,
            suggested_followups: vec![],
        })
    }

    async fn handle_aggregation(
        &self,
        session: &mut Session,
        message: &str,
        action: &ExplorationAction,
    ) -> Result<TurnOutcome> {
        let active = session
            .active_subgroup
            .as_ref()
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!("aggregation with no active subgroup")))?;
        let intent = action
            .aggregation_intent
            .ok_or_else(|| DialogueError::InvalidMessage("aggregation intent not classified".into()))?;
        // The full active subgroup, not just the truncated display page in
        // `active.candidate_set.candidates` — the aggregator covers every
        // matching record (spec.md §8 scenario 5: 705-record subgroup ->
        // 5 publisher bins), and its predicate binds against `mms_id`
        // (`bib_agg::aggregate`'s contract), which is exactly what this
        // returns.
        let ids = bib_exec::all_matching_ids(&self.pool, &active.candidate_set.query_plan).await?;

        let result = bib_agg::aggregate(&self.pool, &ids, intent, action.date_bucket).await?;
        let reply = format!("Aggregated {} group(s) across {} record(s).", result.bins.len(), result.total);
        push_assistant_message(session, &reply, None, None);

        Ok(TurnOutcome {
            session_id: session.id,
            phase: session.phase,
            message: reply,
            candidate_set: None,
            clarification_needed: None,
            confidence: None,
            aggregation: Some(result),
            enrichment: None,
            suggested_followups: vec![],
        })
    }

    async fn handle_metadata_question(&self, session: &mut Session, _message: &str) -> Result<TurnOutcome> {
        let active = session
            .active_subgroup
            .as_ref()
            .ok_or_else(|| DialogueError::Internal(anyhow::anyhow!("metadata question with no active subgroup")))?;

        let answer = metadata::answer(&self.pool, &active.candidate_set).await?;
        let reply = match (answer.earliest_year, answer.latest_year) {
            (Some(earliest), Some(latest)) => {
                format!("{} record(s), spanning {earliest} to {latest}.", answer.count)
            }
            _ => format!("{} record(s).", answer.count),
        };
        push_assistant_message(session, &reply, None, None);

        Ok(TurnOutcome {
            session_id: session.id,
            phase: session.phase,
            message: reply,
            candidate_set: None,
            clarification_needed: None,
            confidence: None,
            aggregation: None,
            enrichment: None,
            suggested_followups: vec![],
        })
    }

    async fn handle_enrichment_request(
        &self,
        session: &mut Session,
        _message: &str,
        action: &ExplorationAction,
    ) -> Result<TurnOutcome> {
        let entity_type = action
            .enrichment_entity_type
            .ok_or_else(|| DialogueError::InvalidMessage("enrichment entity type not classified".into()))?;
        let entity_value = action
            .enrichment_entity_value
            .clone()
            .ok_or_else(|| DialogueError::InvalidMessage("enrichment entity value not classified".into()))?;

        let result = self
            .enrichment
            .enrich(entity_type, &entity_value, action.enrichment_authority_id.as_deref())
            .await;

        let reply = if result.label.is_empty() || result.wikidata_id.is_none() {
            format!("No additional information found for {entity_value}.")
        } else {
            format!("{}: {}", result.label, result.description)
        };
        push_assistant_message(session, &reply, None, None);

        Ok(TurnOutcome {
            session_id: session.id,
            phase: session.phase,
            message: reply,
            candidate_set: None,
            clarification_needed: None,
            confidence: None,
            aggregation: None,
            enrichment: Some(result),
            suggested_followups: vec![],
        })
    }

    fn enter_corpus_exploration(
        &self,
        session: &mut Session,
        message: &str,
        plan: &QueryPlan,
        candidate_set: bib_core::model::CandidateSet,
    ) {
        let filter_summary = plan
            .filters
            .iter()
            .map(|f| format!("{:?}", f.field))
            .collect::<Vec<_>>()
            .join(", ");
        session.active_subgroup = Some(ActiveSubgroup {
            candidate_set,
            defining_query: message.to_string(),
            filter_summary,
            created_at: Utc::now(),
        });
        session.phase = Phase::CorpusExploration;
    }
}

fn push_user_message(session: &mut Session, content: &str) {
    session.messages.push(Message {
        role: MessageRole::User,
        content: content.to_string(),
        query_plan: None,
        candidate_set: None,
        timestamp: Utc::now(),
    });
}

fn push_assistant_message(
    session: &mut Session,
    content: &str,
    query_plan: Option<QueryPlan>,
    candidate_set: Option<bib_core::model::CandidateSet>,
) {
    session.messages.push(Message {
        role: MessageRole::Assistant,
        content: content.to_string(),
        query_plan,
        candidate_set,
        timestamp: Utc::now(),
    });
}

/// Maps a language-name filter value to its MARC/ISO 639-2 code (spec.md §9
/// Open Question: "a language-name -> code mapping at the dialogue-to-SQL
/// boundary") before a plan ever reaches `bib_exec`/the Schema Contract — a
/// value not recognized as a name (e.g. already a code, or unrecognized) is
/// left as-is.
fn normalize_language_filter(filter: &mut Filter) {
    if filter.field != FilterField::Language {
        return;
    }
    match &mut filter.value {
        FilterValue::Scalar(v) => {
            if let Some(code) = bib_agg::lang::iso_for_name(v) {
                *v = code.to_string();
            }
        }
        FilterValue::List(values) => {
            for v in values.iter_mut() {
                if let Some(code) = bib_agg::lang::iso_for_name(v) {
                    *v = code.to_string();
                }
            }
        }
        FilterValue::Range { .. } => {}
    }
}

fn normalize_language_filters(plan: &mut QueryPlan) {
    for filter in &mut plan.filters {
        normalize_language_filter(filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::QUERY_PLAN_VERSION;
    use bib_enrich::{Enricher, SqliteEnrichmentCacheStore};
    use bib_index::store::IndexStore;
    use bib_plan::{FixtureNlClient, MemoryPlanCacheStore, ProposedPlan};
    use bib_sessions::SqliteSessionStore;

    use crate::classify::FixtureExplorationClassifier;

    fn empty_plan() -> QueryPlan {
        QueryPlan {
            version: QUERY_PLAN_VERSION.to_string(),
            intent: "search".into(),
            filters: vec![],
            limit: 50,
            order: None,
        }
    }

    async fn fresh_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        IndexStore::new(pool.clone()).ensure_schema().await.unwrap();
        pool
    }

    async fn seed_record(pool: &SqlitePool, mms_id: &str, title: &str) {
        let record_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO records (record_id, mms_id, source_file, schema_version) VALUES (?, ?, 't.xml', '1.0')",
        )
        .bind(&record_id)
        .bind(mms_id)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO titles (record_id, title, title_raw, title_source_path) VALUES (?, ?, ?, '245$a')")
            .bind(&record_id)
            .bind(title)
            .bind(title)
            .execute(pool)
            .await
            .unwrap();
    }

    async fn engine_with(
        nl: FixtureNlClient,
        exploration: FixtureExplorationClassifier,
    ) -> (DialogueEngine<MemoryPlanCacheStore>, SqlitePool) {
        let pool = fresh_pool().await;
        let session_store = SqliteSessionStore::new(pool.clone());
        session_store.ensure_schema().await.unwrap();

        let enrich_store = SqliteEnrichmentCacheStore::new(pool.clone());
        enrich_store.ensure_schema().await.unwrap();
        let enricher = Enricher::new(enrich_store, bib_enrich::source::FixtureSource::default());

        let engine = DialogueEngine::new(
            Arc::new(nl),
            Arc::new(PlanCache::new(MemoryPlanCacheStore::default())),
            Arc::new(exploration),
            Arc::new(session_store),
            pool.clone(),
            Arc::new(enricher),
        );
        (engine, pool)
    }

    #[tokio::test]
    async fn unknown_session_errors() {
        let (engine, _pool) =
            engine_with(FixtureNlClient::always_unavailable(), FixtureExplorationClassifier::always_unavailable())
                .await;
        let err = engine.handle_turn(Uuid::new_v4(), "books about Paris").await.unwrap_err();
        assert!(matches!(err, DialogueError::UnknownSession(_)));
    }

    #[tokio::test]
    async fn low_confidence_clarifies_and_stays_in_query_definition() {
        let (engine, _pool) = engine_with(
            FixtureNlClient::with_fixed_plan(ProposedPlan {
                overall_confidence: 0.4,
                query_plan: empty_plan(),
                uncertainties: vec!["ambiguous place name".into()],
            }),
            FixtureExplorationClassifier::always_unavailable(),
        )
        .await;

        let session_id = engine.create_session().await.unwrap();
        let outcome = engine.handle_turn(session_id, "books from somewhere").await.unwrap();

        assert_eq!(outcome.clarification_needed, Some(true));
        assert_eq!(outcome.phase, Phase::QueryDefinition);
        assert!(outcome.candidate_set.is_none());
    }

    #[tokio::test]
    async fn confident_plan_executes_and_enters_corpus_exploration() {
        let (engine, pool) = engine_with(
            FixtureNlClient::with_fixed_plan(ProposedPlan {
                overall_confidence: 0.95,
                query_plan: empty_plan(),
                uncertainties: vec![],
            }),
            FixtureExplorationClassifier::always_unavailable(),
        )
        .await;
        seed_record(&pool, "mms1", "A History of Paris").await;

        let session_id = engine.create_session().await.unwrap();
        let outcome = engine.handle_turn(session_id, "all books").await.unwrap();

        assert_eq!(outcome.phase, Phase::CorpusExploration);
        let set = outcome.candidate_set.unwrap();
        assert_eq!(set.total_count, 1);
        assert_eq!(set.candidates[0].record_id, "mms1");
    }

    #[tokio::test]
    async fn metadata_question_is_answered_without_the_nl_step() {
        let (engine, pool) = engine_with(
            FixtureNlClient::with_fixed_plan(ProposedPlan {
                overall_confidence: 0.95,
                query_plan: empty_plan(),
                uncertainties: vec![],
            }),
            FixtureExplorationClassifier::with_fixed_action(ExplorationAction {
                intent: ExplorationIntent::MetadataQuestion,
                refinement_filters: vec![],
                aggregation_intent: None,
                date_bucket: None,
                enrichment_entity_type: None,
                enrichment_entity_value: None,
                enrichment_authority_id: None,
            }),
        )
        .await;
        seed_record(&pool, "mms1", "A History of Paris").await;

        let session_id = engine.create_session().await.unwrap();
        engine.handle_turn(session_id, "all books").await.unwrap();
        let outcome = engine.handle_turn(session_id, "how many are there?").await.unwrap();

        assert_eq!(outcome.phase, Phase::CorpusExploration);
        assert!(outcome.message.contains('1'));
    }

}

