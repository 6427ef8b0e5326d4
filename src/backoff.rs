//! Reconnect delay policy.
//!
//! [`Backoff`] is a plain state machine with no timers of its own, so the
//! doubling/cap/reset rules can be checked without waiting on a clock. The
//! relay's connection loop is the only place that sleeps on its output.

use std::time::Duration;

use rand::Rng;

/// Default delay before the first reconnect attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default ceiling for the doubled delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(128_000);

/// Default exclusive upper bound of the random jitter.
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1000);

/// Tunables for [`Backoff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay used for the first attempt after a successful connection.
    pub base: Duration,
    /// Ceiling for the doubled delay (jitter is added on top).
    pub max: Duration,
    /// Jitter is drawn uniformly from `[0, max_jitter)`.
    pub max_jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_DELAY,
            max: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

/// One scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    /// 1-based count of consecutive failures, reset by a successful connect.
    pub attempt: u32,
    /// The doubled delay without jitter.
    pub base: Duration,
    pub jitter: Duration,
}

impl ScheduledRetry {
    /// Total time to wait before reconnecting.
    pub fn delay(&self) -> Duration {
        self.base + self.jitter
    }
}

/// Exponential reconnect backoff shared by the whole relay.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            current: config.base,
            config,
            attempt: 0,
        }
    }

    /// The delay the next failure will schedule, without jitter.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Schedule a retry using random jitter.
    pub fn next_retry(&mut self) -> ScheduledRetry {
        let max_ms = u64::try_from(self.config.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter = if max_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..max_ms))
        };
        self.next_retry_with_jitter(jitter)
    }

    /// Schedule a retry with a caller-supplied jitter.
    ///
    /// Returns the current delay, then doubles it up to the configured
    /// ceiling for the following failure.
    pub fn next_retry_with_jitter(&mut self, jitter: Duration) -> ScheduledRetry {
        self.attempt = self.attempt.saturating_add(1);
        let retry = ScheduledRetry {
            attempt: self.attempt,
            base: self.current,
            jitter,
        };
        self.current = self.current.saturating_mul(2).min(self.config.max);
        retry
    }

    /// Return to the base delay after a successful connection.
    pub fn reset(&mut self) {
        self.current = self.config.base;
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn delays_double_until_the_ceiling() {
        let mut backoff = Backoff::default();
        let delays: Vec<u128> = (0..10)
            .map(|_| backoff.next_retry_with_jitter(Duration::ZERO).base.as_millis())
            .collect();
        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 16000, 32000, 64000, 128_000, 128_000, 128_000]
        );
    }

    #[test]
    fn reset_returns_to_base() {
        let mut backoff = Backoff::default();
        for _ in 0..5 {
            backoff.next_retry_with_jitter(Duration::ZERO);
        }
        assert_eq!(backoff.current(), ms(32000));
        backoff.reset();
        assert_eq!(backoff.current(), ms(1000));
        let retry = backoff.next_retry_with_jitter(ms(5));
        assert_eq!(retry.attempt, 1);
        assert_eq!(retry.delay(), ms(1005));
    }

    #[test]
    fn random_jitter_stays_below_bound() {
        let mut backoff = Backoff::default();
        for _ in 0..200 {
            let retry = backoff.next_retry();
            assert!(retry.jitter < DEFAULT_MAX_JITTER);
            backoff.reset();
        }
    }

    #[test]
    fn zero_jitter_bound_disables_jitter() {
        let mut backoff = Backoff::new(BackoffConfig {
            max_jitter: Duration::ZERO,
            ..BackoffConfig::default()
        });
        assert_eq!(backoff.next_retry().jitter, Duration::ZERO);
    }

    #[test]
    fn non_power_of_two_ceiling_is_respected() {
        let mut backoff = Backoff::new(BackoffConfig {
            base: ms(1000),
            max: ms(5000),
            max_jitter: Duration::ZERO,
        });
        let delays: Vec<Duration> = (0..5)
            .map(|_| backoff.next_retry_with_jitter(Duration::ZERO).base)
            .collect();
        assert_eq!(delays, vec![ms(1000), ms(2000), ms(4000), ms(5000), ms(5000)]);
    }
}
