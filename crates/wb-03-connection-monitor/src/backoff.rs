use std::time::Duration;

/// Doubling backoff with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before attempt `attempt` (1-based): `base * 2^(attempt-1)`,
    /// capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max)
            .min(self.max)
    }

    /// Delays for attempts `1..=attempts`.
    pub fn schedule(&self, attempts: u32) -> Vec<Duration> {
        (1..=attempts).map(|a| self.delay(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_from_base() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(60));
        assert_eq!(
            policy.schedule(5),
            vec![2, 4, 8, 16, 32]
                .into_iter()
                .map(Duration::from_secs)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_capped_at_max() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), Duration::from_secs(10));
        assert_eq!(policy.delay(4), Duration::from_secs(10));
        assert_eq!(policy.delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_schedule_is_non_decreasing() {
        let policy = BackoffPolicy::new(Duration::from_millis(250), Duration::from_secs(60));
        let schedule = policy.schedule(20);
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
    }
}
