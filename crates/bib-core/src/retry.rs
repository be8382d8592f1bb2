//! Capped exponential backoff for the external HTTP calls this service makes
//! (NL plan compilation, exploration classification, enrichment lookups —
//! spec.md §7: "Retries are applied only to external HTTP ... with capped
//! exponential backoff"). Shared here so `bib-plan`, `bib-dialogue`, and
//! `bib-enrich` all retry the same way instead of each growing its own.

use std::time::Duration;

use tokio::time::sleep;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Retryable,
    NonRetryable,
}

/// 429/502/503/504 and 529 (Anthropic's "overloaded") are transient; every
/// other status is treated as a client/request problem that retrying won't
/// fix.
pub fn classify_status(status: u16) -> ErrorClass {
    match status {
        429 | 502 | 503 | 504 | 529 => ErrorClass::Retryable,
        _ => ErrorClass::NonRetryable,
    }
}

fn delay_for(attempt: u32, config: &RetryConfig) -> Duration {
    let base = config.base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(base.min(config.max_delay_ms))
}

/// Runs `attempt` up to `config.max_attempts` times. `attempt` returns
/// `Ok(ErrorClass::NonRetryable)` bundled into the error case via
/// `Result<T, (E, ErrorClass)>` so the caller decides, per failure, whether
/// this was a transport-level problem (worth retrying) or a response the
/// server actually sent back (classified by status).
pub async fn with_retry<T, E, F, Fut>(config: RetryConfig, mut attempt: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, (E, ErrorClass)>>,
{
    let mut last_err = None;
    for n in 0..config.max_attempts {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err((err, ErrorClass::Retryable)) if n + 1 < config.max_attempts => {
                sleep(delay_for(n, &config)).await;
                last_err = Some(err);
            }
            Err((err, _)) => return Err(err),
        }
    }
    Err(last_err.expect("loop runs at least once since max_attempts is never 0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_statuses_as_retryable() {
        assert_eq!(classify_status(429), ErrorClass::Retryable);
        assert_eq!(classify_status(503), ErrorClass::Retryable);
        assert_eq!(classify_status(529), ErrorClass::Retryable);
        assert_eq!(classify_status(400), ErrorClass::NonRetryable);
        assert_eq!(classify_status(404), ErrorClass::NonRetryable);
    }

    #[test]
    fn delay_grows_exponentially_and_caps() {
        let config = RetryConfig { max_attempts: 5, base_delay_ms: 500, max_delay_ms: 4_000 };
        assert_eq!(delay_for(0, &config).as_millis(), 500);
        assert_eq!(delay_for(1, &config).as_millis(), 1_000);
        assert_eq!(delay_for(2, &config).as_millis(), 2_000);
        assert_eq!(delay_for(3, &config).as_millis(), 4_000);
        assert_eq!(delay_for(10, &config).as_millis(), 4_000);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let config = RetryConfig { max_attempts: 3, base_delay_ms: 1, max_delay_ms: 1 };
        let result: Result<&str, String> = with_retry(config, |n| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                if n < 2 {
                    Err(("server overloaded".to_string(), ErrorClass::Retryable))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_errors_fail_immediately() {
        let calls = std::sync::atomic::AtomicU32::new(0);
        let config = RetryConfig::default();
        let result: Result<&str, String> = with_retry(config, |_| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err(("bad request".to_string(), ErrorClass::NonRetryable))
            }
        })
        .await;
        assert_eq!(result, Err("bad request".to_string()));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
