use rand::Rng;
use std::time::Duration;

/// Exponential backoff for rate-limited and transient failures.
///
/// Retry `n` (zero based) waits `base * 2^n`, so three retries wait
/// `base`, `2 * base`, `4 * base`.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_retries: u32,
    pub retry_base: Duration,
    pub rate_limit_base: Duration,
}

impl BackoffPolicy {
    pub fn new(max_retries: u32, retry_base: Duration, rate_limit_base: Duration) -> Self {
        Self {
            max_retries,
            retry_base,
            rate_limit_base,
        }
    }

    /// Delay before retry `attempt` after a transient failure.
    pub fn transient_delay(&self, attempt: u32) -> Duration {
        scale(self.retry_base, attempt)
    }

    /// Delay before retry `attempt` after an HTTP 429.
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        scale(self.rate_limit_base, attempt)
    }

    /// Total attempts including the initial request.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

fn scale(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Randomized delay applied before every request.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    min: Duration,
    max: Duration,
}

impl Pacing {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        let (min_ms, max_ms) = if min_ms <= max_ms {
            (min_ms, max_ms)
        } else {
            (max_ms, min_ms)
        };
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms),
        }
    }

    /// No delay at all.
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    /// Draw a delay uniformly from `[min, max]`.
    pub fn sample(&self) -> Duration {
        if self.max.is_zero() {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(u64::try_from(ms).unwrap_or(u64::MAX))
    }

    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = BackoffPolicy::new(3, Duration::from_secs(1), Duration::from_secs(60));

        assert_eq!(policy.rate_limit_delay(0), Duration::from_secs(60));
        assert_eq!(policy.rate_limit_delay(1), Duration::from_secs(120));
        assert_eq!(policy.rate_limit_delay(2), Duration::from_secs(240));

        assert_eq!(policy.transient_delay(0), Duration::from_secs(1));
        assert_eq!(policy.transient_delay(3), Duration::from_secs(8));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = BackoffPolicy::new(3, Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(
            policy.transient_delay(200),
            Duration::from_secs(u64::from(u32::MAX))
        );
    }

    #[test]
    fn test_pacing_within_bounds() {
        let pacing = Pacing::new(1000, 3000);
        for _ in 0..50 {
            let delay = pacing.sample();
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(3000));
        }
    }

    #[test]
    fn test_pacing_swapped_bounds() {
        let pacing = Pacing::new(50, 10);
        let delay = pacing.sample();
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_pacing_none_does_not_sleep() {
        let started = std::time::Instant::now();
        Pacing::none().wait().await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
