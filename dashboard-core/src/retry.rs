//! Timing primitives for client-side retry loops.
//!
//! Retry loops never call `tokio::time::sleep` directly. They go through a
//! [`Delay`], so tests can swap in [`RecordingDelay`] and assert on the exact
//! schedule without waiting on real timers.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Suspends the current task for a duration.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[async_trait]
impl<D: Delay + ?Sized> Delay for Arc<D> {
    async fn sleep(&self, duration: Duration) {
        (**self).sleep(duration).await
    }
}

/// Real timer backed by the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Returns immediately and remembers every requested duration.
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in call order.
    pub fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Recorded durations that match `duration`.
    pub fn count_of(&self, duration: Duration) -> usize {
        self.recorded().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut slept) = self.slept.lock() {
            slept.push(duration);
        }
    }
}

/// Linear backoff: the wait for step `n` is `n * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub step: Duration,
}

impl LinearBackoff {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    pub fn from_millis(step_ms: u64) -> Self {
        Self::new(Duration::from_millis(step_ms))
    }

    /// Delay for the given multiplier, saturating instead of overflowing.
    pub fn delay_for(&self, n: u32) -> Duration {
        self.step.saturating_mul(n)
    }
}
