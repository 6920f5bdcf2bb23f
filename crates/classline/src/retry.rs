//! Reconnect backoff policy.
//!
//! The manager never gives up on a lost connection; this module only
//! decides how long to wait between attempts. Delays grow exponentially
//! from [`initial_delay`](ReconnectConfig::initial_delay) up to a hard
//! cap, with a small random jitter so a fleet of clients that lost the
//! same relay does not reconnect in lockstep.

use std::time::Duration;

use rand::Rng;

/// Backoff parameters for reconnect scheduling.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on the computed delay, jitter excluded.
    pub max_delay: Duration,
    /// Growth factor per failed attempt.
    pub multiplier: f64,
    /// Maximum random jitter added on top of the computed delay.
    pub max_jitter: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl ReconnectConfig {
    /// A constant-delay policy with no jitter. Mostly useful in tests.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
            max_jitter: Duration::ZERO,
        }
    }

    /// Returns a copy with out-of-range fields clamped to sane values.
    pub fn validated(self) -> Self {
        let mut config = self;
        if config.multiplier < 1.0 {
            tracing::warn!(
                multiplier = config.multiplier,
                "multiplier below 1.0, clamping to 1.0"
            );
            config.multiplier = 1.0;
        }
        if config.max_delay < config.initial_delay {
            tracing::warn!(
                "max_delay below initial_delay, raising to initial_delay"
            );
            config.max_delay = config.initial_delay;
        }
        config
    }

    /// Computes the delay before attempt number `retry_count`.
    ///
    /// `retry_count` is 1-based: the first retry waits `initial_delay`,
    /// each further retry multiplies by `multiplier`, capped at
    /// `max_delay`. Jitter in `0..max_jitter` is added after capping.
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        // Exponent is clamped so powi cannot overflow to infinity.
        let exponent = retry_count.saturating_sub(1).min(16) as i32;
        let base =
            self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = if self.max_jitter.is_zero() {
            0.0
        } else {
            rand::rng().random_range(0.0..self.max_jitter.as_secs_f64())
        };
        Duration::from_secs_f64(capped + jitter)
    }
}
