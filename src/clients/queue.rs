//! Process-wide dispatch gate for outbound Jikan requests.
//!
//! Jikan throttles per client IP, so every request made by this process goes
//! through one `RequestQueue`. Callers wait on a fair (FIFO) async mutex; the
//! holder sleeps until `min_interval` has passed since the previous dispatch,
//! stamps the dispatch time and releases the gate before running its work.
//! Dispatch starts are therefore ordered and spaced, while responses may
//! complete in any order.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug)]
pub struct RequestQueue {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl RequestQueue {
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::const_new(None),
        }
    }

    /// Runs `work` once it is this caller's turn to dispatch.
    pub async fn run<F, Fut, T>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.wait_turn().await;
        work().await
    }

    async fn wait_turn(&self) {
        let mut last = self.last_dispatch.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                trace!(
                    wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                    "Request queue spacing dispatch"
                );
                tokio::time::sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
    }
}
