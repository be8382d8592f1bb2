pub mod cache_store;
pub mod error;
pub mod fanout;
pub mod job_queue;
pub mod rate_limit;
pub mod reaper;
pub mod schema_sql;
pub mod source;

pub use cache_store::SqliteEnrichmentCacheStore;
pub use error::{EnrichError, Result};
pub use fanout::Enricher;
pub use job_queue::JobQueue;
pub use rate_limit::HostRateLimiter;
pub use reaper::run_reaper;
pub use source::{KnowledgeBaseSource, WikidataClient};
