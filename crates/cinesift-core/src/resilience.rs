//! Resilience primitives shared by every network client.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use backon::{ExponentialBuilder, Retryable};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};

/// Errors that can tell whether retrying the failed call may succeed.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Per-source rate limiter using a token-bucket approach.
///
/// Limits throughput to a configurable number of requests per second by
/// combining a single-permit [`Semaphore`] with a fixed sleep interval.
/// Clones share the same bucket, so one limiter can pace a whole pool of
/// workers.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a new `RateLimiter` that allows at most
    /// `requests_per_second` requests per second (at least one).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = u64::from(requests_per_second.max(1));
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval: Duration::from_millis(1000 / rps),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            interval: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits until a request slot is available, then holds the slot for
    /// the configured interval to enforce the rate limit.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        // The semaphore is never closed, so `acquire` always yields a permit.
        if let Ok(_permit) = self.semaphore.acquire().await {
            sleep(self.interval).await;
        }
    }
}

/// Bounded exponential backoff for transient upstream failures.
///
/// `max_retries = 0` disables retrying: the first failure is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms.max(self.min_delay_ms)))
            .with_max_times(self.max_retries)
            .with_jitter()
    }

    /// Run `op`, retrying transient failures according to this policy.
    pub async fn run<T, E, F, Fut>(&self, label: &str, op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + Display,
    {
        if self.max_retries == 0 {
            let mut op = op;
            return op().await;
        }

        op.retry(self.backoff())
            .sleep(sleep)
            .when(|e: &E| e.is_transient())
            .notify(|e: &E, delay: Duration| {
                log::warn!("{} failed, retrying in {:?}: {}", label, delay, e);
            })
            .await
    }
}
