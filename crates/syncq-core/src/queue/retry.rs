//! Retry policy: suggests backoff delays.

use std::time::Duration;

use rand::Rng;

/// Backoff policy for failed deliveries.
///
/// The delay is informational: the queue logs it and reports it, but never
/// sleeps. Callers decide when the next pass runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay after the first failure.
    pub base_delay: Duration,

    /// Upper bound of any suggested delay (jitter included).
    pub max_delay: Duration,

    /// Jitter is drawn uniformly from `[0, max_jitter)`.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(60_000),
            max_jitter: Duration::from_millis(1_000),
        }
    }
}

impl RetryPolicy {
    /// Suggested delay after a failed attempt.
    ///
    /// # Arguments
    /// * `retry_count` - Count *after* the failed attempt (1-indexed).
    ///
    /// `min(base_delay * 2^(retry_count - 1) + jitter, max_delay)`
    ///
    /// Example with base_delay=1s, max_delay=60s (jitter omitted):
    /// - retry 1: 1s
    /// - retry 2: 2s
    /// - retry 3: 4s
    /// - retry 7: 60s (capped)
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        self.delay_with_jitter(retry_count, self.sample_jitter())
    }

    /// Same as `next_delay` with a caller-chosen jitter.
    pub fn delay_with_jitter(&self, retry_count: u32, jitter: Duration) -> Duration {
        self.exponential(retry_count)
            .saturating_add(jitter)
            .min(self.max_delay)
    }

    /// `base_delay * 2^(retry_count - 1)` without jitter or cap.
    /// `retry_count = 0` is treated like 1.
    pub fn exponential(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.saturating_sub(1);
        let factor = 2u32.saturating_pow(exponent);
        self.base_delay.saturating_mul(factor)
    }

    fn sample_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn default_policy_has_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.max_jitter, Duration::from_secs(1));
    }

    #[test]
    fn exponential_backoff_doubles() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.exponential(1), Duration::from_secs(1));
        assert_eq!(policy.exponential(2), Duration::from_secs(2));
        assert_eq!(policy.exponential(3), Duration::from_secs(4));
        assert_eq!(policy.exponential(0), Duration::from_secs(1));
    }

    #[test]
    fn cap_applies_after_jitter() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_with_jitter(6, Duration::from_millis(999)),
            Duration::from_millis(32_999)
        );
        assert_eq!(
            policy.delay_with_jitter(7, Duration::from_millis(500)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn huge_retry_counts_saturate() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(u32::MAX), Duration::from_secs(60));
    }

    #[rstest]
    fn delay_stays_within_bounds(#[values(1, 2, 3, 4, 5, 6, 7, 8, 9, 10)] retry_count: u32) {
        let policy = RetryPolicy::default();
        let floor = policy.exponential(retry_count).min(policy.max_delay);

        for _ in 0..50 {
            let delay = policy.next_delay(retry_count);
            assert!(delay >= floor, "retry {retry_count}: {delay:?} < {floor:?}");
            assert!(delay <= policy.max_delay);
            // only jitter varies between calls
            assert!(delay - floor < policy.max_jitter);
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let policy = RetryPolicy {
            max_jitter: Duration::ZERO,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.next_delay(3), policy.next_delay(3));
        assert_eq!(policy.next_delay(3), Duration::from_secs(4));
    }
}
