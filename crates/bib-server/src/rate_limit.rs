//! Per-IP token bucket in front of the chat endpoint (spec.md §5 "Rate
//! limiting": "A per-IP token bucket (default 10 req/min) sits in front of
//! the chat endpoint; excess requests receive a 'too many requests' response
//! that does not consume a session mutex"). Mirrors
//! `bib_enrich::rate_limit::HostRateLimiter`'s `Mutex<HashMap<...>>` shape,
//! but rejects over the limit instead of making the caller wait — the spec
//! is explicit that an excess request must never touch the session mutex,
//! so this has to run as a standalone check before any lock is acquired.

use std::collections::HashMap;
use std::net::IpAddr;

use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct ChatRateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<IpAddr, Bucket>>,
}

impl ChatRateLimiter {
    pub fn new(capacity: u32, per_minute: u32) -> Self {
        Self {
            capacity: capacity as f64,
            refill_per_sec: per_minute as f64 / 60.0,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Attempts to take one token for `ip`. Returns `false` once the bucket
    /// is empty — the caller must reject the request without acquiring
    /// anything else.
    pub async fn try_acquire(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.entry(ip).or_insert_with(|| Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

impl Default for ChatRateLimiter {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_capacity_then_rejects() {
        let limiter = ChatRateLimiter::new(3, 3);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.try_acquire(ip).await);
        assert!(limiter.try_acquire(ip).await);
        assert!(limiter.try_acquire(ip).await);
        assert!(!limiter.try_acquire(ip).await);
    }

    #[tokio::test]
    async fn distinct_ips_have_independent_buckets() {
        let limiter = ChatRateLimiter::new(1, 1);
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.try_acquire(a).await);
        assert!(!limiter.try_acquire(a).await);
        assert!(limiter.try_acquire(b).await);
    }
}
