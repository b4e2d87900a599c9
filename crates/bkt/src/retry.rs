// ai
//! 🔁 UploadRetrier — "have you tried turning it off and on again?" as a bounded loop.
//!
//! 🎬 *[the upload fails. the retrier sighs, sets a timer, and tries again.]*
//! *[it does this exactly `max_attempts` times. then it gives up and tells the caller.]*
//!
//! 🧠 Knowledge graph:
//! - Wraps any `FnMut() -> Future<Output = Result<(), StoreError>>`. Both `StoreError`
//!   flavors are treated as retryable.
//! - Success on any attempt returns `Ok(true)` right away.
//! - Exhausting the budget returns `Ok(false)`. The retrier never decides that losing a
//!   buffer is fatal; the coordinator does.
//! - The sleep between attempts races a `CancellationToken`. Cancel mid-sleep and the loop
//!   stops with `SinkError::Cancelled` instead of pretending nothing happened.
//! - Delay is fixed (5s by default) plus optional proportional jitter.
//!
//! ⚠️ `max_attempts` counts *attempts*, not re-attempts. N = 3 means three `put`s and two naps.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{SinkError, StoreError};

/// ⏱️ The reference nap between attempts. Five seconds of quiet reflection.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// 🔁 Bounded retry with a cancellation-aware sleep.
#[derive(Debug, Clone)]
pub struct UploadRetrier {
    max_attempts: u32,
    delay: Duration,
    jitter: f64,
    cancel: CancellationToken,
}

impl UploadRetrier {
    /// 🏗️ `max_attempts` of zero is bumped to one: we always try at least once.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: 0.0,
            cancel: CancellationToken::new(),
        }
    }

    /// 🎲 Add up to `jitter * delay` of random extra sleep per retry. Negative or NaN means none.
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = if jitter.is_finite() && jitter > 0.0 { jitter } else { 0.0 };
        self
    }

    /// 🛑 Share a cancellation token with whoever owns the shutdown button.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 🎯 Run `operation` until it succeeds, the budget runs out, or someone cancels.
    ///
    /// `what` is only used for log lines (typically the storage key).
    pub async fn attempt<F, Fut>(&self, what: &str, mut operation: F) -> Result<bool, SinkError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        let mut remaining = self.max_attempts;
        let mut attempt_number = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return Err(SinkError::Cancelled {
                    key: what.to_string(),
                });
            }

            attempt_number += 1;
            let failure = match operation().await {
                Ok(()) => {
                    debug!("✅ '{}' uploaded on attempt {}", what, attempt_number);
                    return Ok(true);
                }
                Err(failure) => failure,
            };

            remaining -= 1;
            if remaining == 0 {
                error!(
                    "💀 giving up on '{}' after {} attempt(s). last error: {}",
                    what, attempt_number, failure
                );
                return Ok(false);
            }

            let pause = self.next_delay();
            warn!(
                "🔁 upload of '{}' failed on attempt {} ({} left), retrying in {:?}: {}",
                what, attempt_number, remaining, pause, failure
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("🛑 retry of '{}' cancelled mid-nap after {} attempt(s)", what, attempt_number);
                    return Err(SinkError::Cancelled { key: what.to_string() });
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    fn next_delay(&self) -> Duration {
        if self.jitter == 0.0 || self.delay.is_zero() {
            return self.delay;
        }
        let extra = rand::rng().random_range(0.0..=self.jitter);
        self.delay + self.delay.mul_f64(extra)
    }
}
