use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::GradeError;

/// Backoff for provider rate limits.
///
/// The defaults respect a 10 requests/minute free-tier quota: callers pace
/// each call with [`BackoffPolicy::pace`], and a rate-limited attempt `n`
/// (starting at 0) waits `base_delay * 2^n` before trying again.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_secs")]
    pub base_delay: Duration,
    #[serde(with = "duration_secs")]
    pub pacing_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(7),
            pacing_delay: Duration::from_secs(7),
        }
    }
}

impl BackoffPolicy {
    /// No sleeping at all. Used by tests and by providers without quotas.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            pacing_delay: Duration::ZERO,
        }
    }

    /// Sleeps for `pacing_delay`, spacing out consecutive quota-bound calls.
    pub async fn pace(&self) {
        if !self.pacing_delay.is_zero() {
            tokio::time::sleep(self.pacing_delay).await;
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Runs `op` until it succeeds, fails with a non rate-limit error, or the
/// policy runs out of attempts. The last error is returned in that case.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &BackoffPolicy,
    mut op: F,
) -> Result<T, GradeError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GradeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_rate_limited() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "rate limited, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom(
                "duration must be a non-negative number of seconds",
            ));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}
