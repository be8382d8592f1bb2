//! Plan cache (spec.md §4.3 "Plan cache"): single-flight over a
//! request-fingerprint -> QueryPlan store, append-only and file-backed.
//!
//! No single-flight primitive exists in the teacher's stack to copy
//! directly; the `Mutex<HashMap<K, Arc<OnceCell<...>>>>` shape here follows
//! the general pattern of coordinating concurrent access behind an `Arc`
//! that the teacher uses elsewhere (`sem_os_server::main` wiring shared
//! state through `Arc<...>` handles).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use bib_core::ports::{CachedPlan, PlanCacheStore, Result as PortResult};
use bib_core::CoreError;

use crate::error::{PlanError, Result};

type Flight = Arc<OnceCell<std::result::Result<CachedPlan, String>>>;

/// Wraps any [`PlanCacheStore`] with single-flight coordination: at most one
/// `compute` future per cache key runs at a time; concurrent callers for the
/// same key await the first caller's result rather than recomputing.
pub struct PlanCache<S: PlanCacheStore> {
    store: S,
    in_flight: Mutex<HashMap<String, Flight>>,
}

impl<S: PlanCacheStore> PlanCache<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Canonical cache key: a normalized question's JSON-serialized text.
    /// Normalization (trim, single-space collapse, lowercase) keeps
    /// cosmetically different phrasings of the same question from missing
    /// the cache — it is not the Normalizer's place/publisher cleaning.
    pub fn cache_key(question: &str) -> String {
        let normalized = question.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        serde_json::to_string(&normalized).expect("string serialization cannot fail")
    }

    /// Reads the cache without computing on a miss — `None` means this
    /// exact question has never been cached, not that it failed.
    pub async fn peek(&self, question: &str) -> Result<Option<CachedPlan>> {
        self.store.get(&Self::cache_key(question)).await.map_err(PlanError::from)
    }

    /// Returns the cached plan for `question`, computing it via `compute` at
    /// most once per key even under concurrent callers.
    pub async fn get_or_compile<F, Fut>(&self, question: &str, compute: F) -> Result<CachedPlan>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CachedPlan>>,
    {
        let key = Self::cache_key(question);

        if let Some(cached) = self.store.get(&key).await.map_err(PlanError::from)? {
            return Ok(cached);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.entry(key.clone()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        let result = flight
            .get_or_init(|| async {
                match compute().await {
                    Ok(plan) => Ok(plan),
                    Err(e) => Err(e.to_string()),
                }
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().await;
            in_flight.remove(&key);
        }

        match result {
            Ok(plan) => {
                self.store.put(&key, &plan).await.map_err(PlanError::from)?;
                Ok(plan)
            }
            Err(msg) => Err(PlanError::NlUnavailable(msg)),
        }
    }
}

/// File-backed, append-only [`PlanCacheStore`]: loaded fully into memory at
/// construction (spec.md "read on process start") and appended to on every
/// `put`. A JSONL file rather than a single JSON document so a crash mid-write
/// loses at most the last line, not the whole cache.
pub struct FilePlanCacheStore {
    path: std::path::PathBuf,
    entries: Mutex<HashMap<String, CachedPlan>>,
}

impl FilePlanCacheStore {
    pub async fn open(path: impl Into<std::path::PathBuf>) -> PortResult<Self> {
        let path = path.into();
        let mut entries = HashMap::new();
        if let Ok(contents) = tokio::fs::read_to_string(&path).await {
            for (line_no, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let record: CacheRecord = serde_json::from_str(line).map_err(|e| {
                    CoreError::MalformedJsonl {
                        line: line_no + 1,
                        source: e,
                    }
                })?;
                entries.insert(record.key, record.plan);
            }
        }
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
struct CacheRecord {
    key: String,
    plan: CachedPlan,
}

#[async_trait]
impl PlanCacheStore for FilePlanCacheStore {
    async fn get(&self, cache_key: &str) -> PortResult<Option<CachedPlan>> {
        Ok(self.entries.lock().await.get(cache_key).cloned())
    }

    async fn put(&self, cache_key: &str, plan: &CachedPlan) -> PortResult<()> {
        let record = CacheRecord {
            key: cache_key.to_string(),
            plan: plan.clone(),
        };
        let line = serde_json::to_string(&record).map_err(|e| {
            CoreError::Internal(anyhow::anyhow!(e))
        })?;
        use tokio::io::AsyncWriteExt;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(CoreError::Io)?;
        file.write_all(line.as_bytes()).await.map_err(CoreError::Io)?;
        file.write_all(b"\n").await.map_err(CoreError::Io)?;

        self.entries.lock().await.insert(cache_key.to_string(), plan.clone());
        Ok(())
    }
}

/// In-memory [`PlanCacheStore`] for tests — avoids touching the filesystem.
#[derive(Default)]
pub struct MemoryPlanCacheStore {
    entries: Mutex<HashMap<String, CachedPlan>>,
}

#[async_trait]
impl PlanCacheStore for MemoryPlanCacheStore {
    async fn get(&self, cache_key: &str) -> PortResult<Option<CachedPlan>> {
        Ok(self.entries.lock().await.get(cache_key).cloned())
    }

    async fn put(&self, cache_key: &str, plan: &CachedPlan) -> PortResult<()> {
        self.entries.lock().await.insert(cache_key.to_string(), plan.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bib_core::model::QUERY_PLAN_VERSION;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn plan() -> CachedPlan {
        CachedPlan {
            query_plan: bib_core::model::QueryPlan {
                version: QUERY_PLAN_VERSION.to_string(),
                intent: "search".into(),
                filters: vec![],
                limit: 10,
                order: None,
            },
            model_id: "test-model".into(),
        }
    }

    #[tokio::test]
    async fn caches_after_first_compile() {
        let cache = PlanCache::new(MemoryPlanCacheStore::default());
        let calls = AtomicU32::new(0);

        let first = cache
            .get_or_compile("Books about Paris", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(plan())
            })
            .await
            .unwrap();
        assert_eq!(first.model_id, "test-model");

        let second = cache
            .get_or_compile("books   about paris", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(plan())
            })
            .await
            .unwrap();
        assert_eq!(second.model_id, "test-model");
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second call should hit the cache");
    }

    #[tokio::test]
    async fn propagates_compute_failure_without_caching() {
        let cache = PlanCache::new(MemoryPlanCacheStore::default());
        let err = cache
            .get_or_compile("unanswerable", || async { Err(PlanError::NlUnavailable("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::NlUnavailable(_)));
    }
}
