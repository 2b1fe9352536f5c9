//! Tiered retry with a fixed backoff table.
//!
//! Errors classed [`ErrorClass::Unavailable`] get a small retry budget, other
//! transient errors a larger one, and permanent errors none. Backoff waits race
//! the caller's cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::traits::{ErrorClass, GatewayError, GatewayResult};

/// Retry budgets and delays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after [`ErrorClass::Unavailable`] failures.
    pub unavailable_retries: u32,
    /// Retries allowed after other [`ErrorClass::Transient`] failures.
    pub transient_retries: u32,
    /// Delay before retry `n` is `delays[n]`; the last entry repeats.
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            unavailable_retries: 2,
            transient_retries: 5,
            delays: [1, 2, 4, 8, 16].map(Duration::from_secs).to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn none() -> Self {
        Self {
            unavailable_retries: 0,
            transient_retries: 0,
            delays: Vec::new(),
        }
    }

    /// Replaces the delay table.
    #[must_use]
    pub fn with_delays(mut self, delays: Vec<Duration>) -> Self {
        self.delays = delays;
        self
    }

    /// Delay before the zero-based `retry`.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let index = usize::try_from(retry).unwrap_or(usize::MAX);
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Retries allowed for an error of `class`.
    #[must_use]
    pub fn budget(&self, class: ErrorClass) -> u32 {
        match class {
            ErrorClass::Unavailable => self.unavailable_retries,
            ErrorClass::Transient => self.transient_retries,
            ErrorClass::Permanent => 0,
        }
    }
}

/// Runs `operation` until it succeeds, fails permanently, exhausts the budget
/// for its error class, or `cancel` fires.
///
/// # Errors
///
/// Returns the last error from `operation`, or [`GatewayError::Cancelled`]
/// when cancellation is observed before an attempt or during a backoff wait.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> GatewayResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    let mut retries = 0_u32;
    loop {
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let class = err.class();
        if retries >= policy.budget(class) {
            return Err(err);
        }

        let delay = policy.delay_for_retry(retries);
        retries += 1;
        warn!(
            operation = label,
            attempt = retries,
            ?class,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "retrying model call"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(GatewayError::Cancelled),
            () = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::traits::Provider;

    fn instant() -> RetryPolicy {
        RetryPolicy::default().with_delays(vec![Duration::ZERO])
    }

    async fn count_attempts(policy: &RetryPolicy, make: fn() -> GatewayError) -> (u32, GatewayError) {
        let attempts = AtomicU32::new(0);
        let err = retry_with_backoff(policy, &CancellationToken::new(), "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(make()) }
        })
        .await
        .expect_err("always fails");
        (attempts.load(Ordering::SeqCst), err)
    }

    #[test]
    fn delay_table_repeats_last_entry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_retry(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_retry(4), Duration::from_secs(16));
        assert_eq!(policy.delay_for_retry(9), Duration::from_secs(16));
        assert_eq!(RetryPolicy::none().delay_for_retry(3), Duration::ZERO);
    }

    #[tokio::test]
    async fn unavailable_is_attempted_three_times() {
        let (attempts, err) = count_attempts(&instant(), || {
            GatewayError::from_status(Provider::Gemini, 503, "overloaded")
        })
        .await;
        assert_eq!(attempts, 3);
        assert!(matches!(err, GatewayError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn transient_is_attempted_six_times() {
        let (attempts, _) = count_attempts(&instant(), || {
            GatewayError::from_status(Provider::Gemini, 429, "slow down")
        })
        .await;
        assert_eq!(attempts, 6);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let (attempts, err) = count_attempts(&instant(), || {
            GatewayError::from_status(Provider::Gemini, 400, "bad")
        })
        .await;
        assert_eq!(attempts, 1);
        assert!(matches!(err, GatewayError::BadRequest { .. }));
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let attempts = AtomicU32::new(0);
        let value = retry_with_backoff(&instant(), &CancellationToken::new(), "test", || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(GatewayError::transport("reset"))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        let policy = RetryPolicy::default().with_delays(vec![Duration::from_secs(3600)]);
        let trigger = cancel.clone();
        let attempts = AtomicU32::new(0);

        let err = retry_with_backoff(&policy, &cancel, "test", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            trigger.cancel();
            async { Err::<(), _>(GatewayError::transport("reset")) }
        })
        .await
        .expect_err("cancelled");

        assert!(matches!(err, GatewayError::Cancelled));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
