//! Retry controller: bounded exponential backoff around a publish attempt
//!
//! The attempt sequence is `attempt(n) -> success | retryable failure
//! -> wait(base * multiplier^n) -> attempt(n + 1)`, terminating at the
//! policy's retry budget or on the first non-retryable failure.

use std::future::Future;
use tokio::time::sleep;

use crate::model::{PublishResult, RetryPolicy};
use crate::ports::{AdapterError, Clock};

/// Final result of a full attempt sequence
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub result: PublishResult,
    /// Total attempts performed, including the first
    pub attempts: u32,
}

/// Reusable retry combinator, independent of any specific adapter
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Drive `attempt` until success, a terminal failure, or retry
    /// exhaustion.
    ///
    /// A structured result's `retryable` flag takes precedence; a typed
    /// error classifies by variant; unstructured error text falls back
    /// to the policy's pattern list. After exhaustion the final result
    /// reports the last error with `retryable == false` so the caller
    /// knows no further automatic action will help.
    pub async fn run<Cl, F, Fut>(&self, clock: &Cl, mut attempt: F) -> RetryOutcome
    where
        Cl: Clock + ?Sized,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<PublishResult, AdapterError>>,
    {
        let mut attempts = 0u32;

        loop {
            let n = attempts;
            attempts += 1;

            let (result, retryable) = match attempt(n).await {
                Ok(result) if result.success => {
                    return RetryOutcome { result, attempts };
                }
                Ok(result) => {
                    let retryable = result.retryable;
                    (result, retryable)
                }
                Err(error) => {
                    let retryable = error
                        .retryable_hint()
                        .unwrap_or_else(|| self.policy.matches_retryable_pattern(&error.to_string()));
                    (
                        PublishResult::failed(error.to_string(), retryable, clock.now()),
                        retryable,
                    )
                }
            };

            if !retryable {
                return RetryOutcome { result, attempts };
            }

            if n >= self.policy.max_retries {
                let mut result = result;
                result.retryable = false;
                return RetryOutcome { result, attempts };
            }

            let delay = self.policy.delay_for_attempt(n);
            tracing::debug!(
                attempt = n,
                delay_ms = delay.as_millis() as u64,
                "Publish attempt failed, backing off"
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SystemClock;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use time::OffsetDateTime;
    use tokio::time::Instant;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            ..Default::default()
        }
    }

    fn ok_result() -> PublishResult {
        PublishResult::succeeded("post-1", OffsetDateTime::UNIX_EPOCH)
    }

    fn failed_result(retryable: bool) -> PublishResult {
        PublishResult::failed("remote rejected", retryable, OffsetDateTime::UNIX_EPOCH)
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let controller = RetryController::new(policy(3));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(ok_result())
                }
            })
            .await;

        assert!(outcome.result.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_retryable_failure_stops_after_one_attempt() {
        let controller = RetryController::new(policy(5));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let started = Instant::now();
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(failed_result(false))
                }
            })
            .await;

        assert!(!outcome.result.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // no backoff wait happened
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_errors_three_times_then_success() {
        let controller = RetryController::new(policy(3));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 3 {
                        Err(AdapterError::Api("Network timeout".to_string()))
                    } else {
                        Ok(ok_result())
                    }
                }
            })
            .await;

        assert!(outcome.result.success);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_final_non_retryable_failure() {
        let max_retries = 3;
        let controller = RetryController::new(policy(max_retries));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<PublishResult, _>(AdapterError::Transient("still down".to_string()))
                }
            })
            .await;

        assert!(!outcome.result.success);
        assert_eq!(outcome.attempts, max_retries + 1);
        assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        assert!(!outcome.result.retryable);
        assert!(outcome.result.error.as_deref().unwrap().contains("still down"));
    }

    #[tokio::test(start_paused = true)]
    async fn structured_retryable_flag_wins_over_error_text() {
        // the result says retryable even though the text matches no
        // transient pattern
        let controller = RetryController::new(policy(1));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(failed_result(true))
                }
            })
            .await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_error_text_is_terminal() {
        let controller = RetryController::new(policy(5));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<PublishResult, _>(AdapterError::Api("caption rejected".to_string()))
                }
            })
            .await;

        assert_eq!(outcome.attempts, 1);
        assert!(!outcome.result.retryable);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_delays_follow_the_policy() {
        let controller = RetryController::new(policy(2));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        let started = Instant::now();
        let outcome = controller
            .run(&SystemClock, move |_| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<PublishResult, _>(AdapterError::RateLimited)
                }
            })
            .await;

        // waits of 100ms and 200ms happened between the three attempts
        assert_eq!(outcome.attempts, 3);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }
}
