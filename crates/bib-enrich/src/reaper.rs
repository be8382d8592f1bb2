//! Background cache reaper (spec.md §4.7 "A background reaper removes
//! expired rows"; §5 "Background activities are: cache reaper, optional
//! pre-enrichment worker").

use std::time::Duration;

use bib_core::ports::EnrichmentCacheStore;

/// Runs forever, sweeping expired cache rows every `interval`. Intended to
/// be spawned as a `tokio::task` at process startup; the caller owns
/// cancellation via the task handle.
pub async fn run_reaper<C: EnrichmentCacheStore>(store: C, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match store.reap_expired(chrono::Utc::now()).await {
            Ok(removed) if removed > 0 => tracing::info!(removed, "reaped expired enrichment cache rows"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "enrichment cache reap failed"),
        }
    }
}
