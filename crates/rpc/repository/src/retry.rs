//! Bounded exponential backoff for resubscribing to the full node.
//!
//! `delay(attempt) = min(initial_delay * multiplier^(attempt - 1), max_delay)`

use std::time::Duration;

/// Resubscription policy.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Consecutive failed attempts tolerated before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplicative factor applied per attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-indexed), clamped to `max_delay`.
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if base.is_nan() || base <= 0.0 {
            Duration::ZERO
        } else if base >= max {
            self.max_delay
        } else {
            Duration::from_secs_f64(base)
        }
    }
}

/// Attempt counter driving one retry loop.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Record a failure; `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.config.compute_delay(self.attempts))
    }

    /// Forget past failures after a successful subscription.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_grows_then_clamps() {
        let config = config();
        assert_eq!(config.compute_delay(1), Duration::from_millis(100));
        assert_eq!(config.compute_delay(2), Duration::from_millis(200));
        assert_eq!(config.compute_delay(3), Duration::from_millis(350));
        assert_eq!(config.compute_delay(u32::MAX), Duration::from_millis(350));
    }

    #[test]
    fn test_backoff_exhausts_and_resets() {
        let mut backoff = Backoff::new(config());
        for _ in 0..4 {
            assert!(backoff.next_delay().is_some());
        }
        assert_eq!(backoff.next_delay(), None);

        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_degenerate_multiplier_yields_zero_delay() {
        let config = RetryConfig {
            multiplier: f64::NAN,
            ..config()
        };
        assert_eq!(config.compute_delay(3), Duration::ZERO);
    }
}
