//! Bounded retry around a single remote call.
//!
//! Every attempt is dispatched through the [`RequestQueue`] as its own entry.
//! A throttled attempt waits the server's hint and is repeated without using
//! up an attempt; any other failure backs off `base_delay * n` after the n-th
//! failure until `max_attempts` is reached.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::clients::jikan::JikanError;
use crate::clients::queue::RequestQueue;
use crate::config::JikanConfig;
use crate::constants::{intervals, limits};

/// Attempt and wait limits for one logical call.
///
/// Throttling normally stays invisible to the caller. The one exception is
/// `max_throttle_waits`: once a call has waited that many times it fails with
/// [`JikanError::Throttled`] instead of waiting forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub default_retry_after: Duration,
    pub max_throttle_waits: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            base_delay: intervals::RETRY_BASE_DELAY,
            default_retry_after: intervals::DEFAULT_RETRY_AFTER,
            max_throttle_waits: limits::MAX_THROTTLE_WAITS,
        }
    }
}

impl From<&JikanConfig> for RetryPolicy {
    fn from(config: &JikanConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
            max_throttle_waits: config.max_throttle_waits,
        }
    }
}

/// Why a single attempt did not produce a payload.
#[derive(Debug)]
pub enum AttemptError {
    /// The remote asked us to slow down (HTTP 429).
    Throttled { retry_after: Option<Duration> },
    Failed(JikanError),
}

impl From<JikanError> for AttemptError {
    fn from(err: JikanError) -> Self {
        Self::Failed(err)
    }
}

pub async fn send_with_retry<T, F, Fut>(
    queue: &RequestQueue,
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, JikanError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut failures = 0u32;
    let mut throttle_waits = 0u32;

    loop {
        match queue.run(&mut attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Throttled { retry_after }) => {
                metrics::counter!("jikan_throttled_total").increment(1);

                if throttle_waits >= policy.max_throttle_waits {
                    return Err(JikanError::Throttled {
                        waits: throttle_waits,
                    });
                }
                throttle_waits += 1;

                let wait = retry_after.unwrap_or(policy.default_retry_after);
                warn!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    throttle_waits, "Rate limited by Jikan, waiting before retrying"
                );
                tokio::time::sleep(wait).await;
            }
            Err(AttemptError::Failed(err)) => {
                failures += 1;

                if failures >= policy.max_attempts || !err.is_retryable() {
                    return Err(err);
                }

                let delay = policy.base_delay * failures;
                warn!(
                    attempt = failures,
                    max_attempts = policy.max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Jikan request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnimeId;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn queue() -> RequestQueue {
        RequestQueue::new(Duration::from_millis(350))
    }

    fn server_error() -> AttemptError {
        AttemptError::Failed(JikanError::Status {
            status: 500,
            body: "boom".to_string(),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_call_is_attempted_exactly_max_attempts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result: Result<(), _> = send_with_retry(&queue(), &policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(server_error())
        })
        .await;

        assert!(matches!(result, Err(JikanError::Status { status: 500, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), policy.max_attempts);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_with_attempt_index() {
        let policy = RetryPolicy::default();
        let origin = Instant::now();
        let stamps = &std::sync::Mutex::new(Vec::new());

        let _: Result<(), _> = send_with_retry(&queue(), &policy, move || async move {
            stamps.lock().unwrap().push(Instant::now() - origin);
            Err(server_error())
        })
        .await;

        let stamps = stamps.lock().unwrap().clone();
        assert_eq!(stamps.len(), 3);
        assert!(stamps[1] - stamps[0] >= policy.base_delay);
        assert!(stamps[2] - stamps[1] >= policy.base_delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_does_not_consume_attempts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::default();

        let result = send_with_retry(&queue(), &policy, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            match n {
                0..=3 => Err(AttemptError::Throttled {
                    retry_after: Some(Duration::from_secs(1)),
                }),
                4 | 5 => Err(server_error()),
                _ => Ok("payload"),
            }
        })
        .await;

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn throttle_wait_honors_hint_or_default() {
        let policy = RetryPolicy::default();
        let origin = Instant::now();
        let calls = &AtomicU32::new(0);

        let _ = send_with_retry(&queue(), &policy, move || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(AttemptError::Throttled {
                    retry_after: Some(Duration::from_secs(5)),
                }),
                1 => Err(AttemptError::Throttled { retry_after: None }),
                _ => Ok(()),
            }
        })
        .await;

        assert!(Instant::now() - origin >= Duration::from_secs(5) + policy.default_retry_after);
    }

    #[tokio::test(start_paused = true)]
    async fn endless_throttling_gives_up_after_cap() {
        let policy = RetryPolicy {
            max_throttle_waits: 2,
            ..RetryPolicy::default()
        };
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = send_with_retry(&queue(), &policy, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AttemptError::Throttled { retry_after: None })
        })
        .await;

        assert!(matches!(result, Err(JikanError::Throttled { waits: 2 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_not_retried() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> =
            send_with_retry(&queue(), &RetryPolicy::default(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AttemptError::Failed(JikanError::NotFound(AnimeId::new(1))))
            })
            .await;

        assert!(matches!(result, Err(JikanError::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_is_rate_limited() {
        let queue = RequestQueue::new(Duration::from_secs(10));
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        };
        let origin = Instant::now();
        let stamps = &std::sync::Mutex::new(Vec::new());

        let _: Result<(), _> = send_with_retry(&queue, &policy, move || async move {
            stamps.lock().unwrap().push(Instant::now() - origin);
            Err(server_error())
        })
        .await;

        let stamps = stamps.lock().unwrap().clone();
        assert!(stamps[1] - stamps[0] >= Duration::from_secs(10));
        assert!(stamps[2] - stamps[1] >= Duration::from_secs(10));
    }
}
