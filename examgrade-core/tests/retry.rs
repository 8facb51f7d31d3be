use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;

use examgrade_core::{retry_with_backoff, BackoffPolicy, GradeError};

fn rate_limited() -> GradeError {
    GradeError::RateLimited {
        status: Some(429),
        message: "quota exceeded".to_string(),
    }
}

#[test]
fn default_policy_respects_free_tier_quota() {
    let policy = BackoffPolicy::default();
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.delay_for(0), Duration::from_secs(7));
    assert_eq!(policy.delay_for(1), Duration::from_secs(14));
    assert_eq!(policy.delay_for(2), Duration::from_secs(28));
}

#[test]
fn policy_deserializes_seconds_with_defaults() {
    let policy: BackoffPolicy = serde_json::from_str(r#"{"base_delay": 0.5}"#).unwrap();
    assert_eq!(policy.base_delay, Duration::from_millis(500));
    assert_eq!(policy.max_attempts, 3);
    assert_eq!(policy.pacing_delay, Duration::from_secs(7));
}

#[tokio::test]
async fn retries_rate_limited_errors_until_success() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let result = retry_with_backoff(&BackoffPolicy::immediate(3), |_| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(rate_limited())
            } else {
                Ok("graded")
            }
        }
    })
    .await;

    assert_eq!(result.unwrap(), "graded");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn returns_last_error_once_attempts_are_exhausted() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let result: Result<(), GradeError> = retry_with_backoff(&BackoffPolicy::immediate(3), |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(rate_limited())
        }
    })
    .await;

    assert!(result.unwrap_err().is_rate_limited());
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn does_not_retry_other_errors() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);
    let result: Result<(), GradeError> = retry_with_backoff(&BackoffPolicy::immediate(3), |_| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(GradeError::LlmProvider("HTTP 400: bad request".to_string()))
        }
    })
    .await;

    assert!(matches!(result, Err(GradeError::LlmProvider(_))));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn waits_exponentially_between_attempts() {
    let policy = BackoffPolicy {
        max_attempts: 3,
        base_delay: Duration::from_secs(7),
        pacing_delay: Duration::ZERO,
    };
    let started = tokio::time::Instant::now();
    let result: Result<(), GradeError> =
        retry_with_backoff(&policy, |_| async { Err(rate_limited()) }).await;

    assert!(result.is_err());
    assert!(started.elapsed() >= Duration::from_secs(7 + 14));
}

#[tokio::test(start_paused = true)]
async fn pace_sleeps_for_the_pacing_delay() {
    let policy = BackoffPolicy::default();
    let started = tokio::time::Instant::now();
    policy.pace().await;
    assert!(started.elapsed() >= Duration::from_secs(7));

    let started = tokio::time::Instant::now();
    BackoffPolicy::immediate(1).pace().await;
    assert_eq!(started.elapsed(), Duration::ZERO);
}
