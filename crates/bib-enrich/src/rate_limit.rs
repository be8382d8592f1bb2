//! Per-host rate limiting (spec.md §4.7 "Concurrency": "at least 1s between
//! outbound requests to the same host").

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct HostRateLimiter {
    min_interval: Duration,
    last_request: Mutex<HashMap<String, Instant>>,
}

impl HostRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(HashMap::new()),
        }
    }

    /// Blocks the caller until at least `min_interval` has passed since the
    /// last request to `host`, then records this request's time.
    pub async fn wait_turn(&self, host: &str) {
        let mut guard = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(&last) = guard.get(host) {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                drop(guard);
                tokio::time::sleep(remaining).await;
                guard = self.last_request.lock().await;
            }
        }
        guard.insert(host.to_string(), Instant::now());
    }
}

impl Default for HostRateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serializes_calls_to_the_same_host_by_at_least_the_interval() {
        let limiter = HostRateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait_turn("wikidata.org").await;
        limiter.wait_turn("wikidata.org").await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn distinct_hosts_do_not_wait_on_each_other() {
        let limiter = HostRateLimiter::new(Duration::from_secs(5));
        let start = Instant::now();
        limiter.wait_turn("a.example").await;
        limiter.wait_turn("b.example").await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
