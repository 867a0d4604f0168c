//! Exponential reconnect backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reconnect timing for chat sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds.
    pub initial_ms: u64,
    /// Upper bound for any delay in milliseconds.
    pub max_ms: u64,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Maximum random extra, as a fraction of the computed delay.
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            max_ms: 60_000,
            multiplier: 1.5,
            jitter: 0.2,
        }
    }
}

/// Delay generator. Delays never shrink until [`Backoff::reset`] is called.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempt: u32,
    last: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempt: 0,
            last: Duration::ZERO,
        }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.initial_ms as f64
            * self.config.multiplier.max(1.0).powi(self.attempt.min(64) as i32);
        let jitter = base * self.config.jitter.max(0.0) * rand::random::<f64>();
        let capped = (base + jitter).min(self.config.max_ms as f64);

        let delay = Duration::from_millis(capped as u64).max(self.last);
        self.last = delay;
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last = Duration::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jitter: f64) -> BackoffConfig {
        BackoffConfig {
            initial_ms: 100,
            max_ms: 1_000,
            multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_delays_grow_then_cap() {
        let mut backoff = Backoff::new(config(0.0));
        let delays: Vec<u64> = (0..6)
            .map(|_| backoff.next_delay().as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1_000, 1_000]);
    }

    #[test]
    fn test_jittered_delays_never_decrease() {
        let mut backoff = Backoff::new(config(0.9));
        let mut previous = Duration::ZERO;
        for _ in 0..50 {
            let delay = backoff.next_delay();
            assert!(delay >= previous);
            assert!(delay <= Duration::from_millis(1_000));
            previous = delay;
        }
    }

    #[test]
    fn test_reset_restarts_from_initial() {
        let mut backoff = Backoff::new(config(0.0));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_default_matches_documented_values() {
        let cfg = BackoffConfig::default();
        assert_eq!(cfg.initial_ms, 500);
        assert_eq!(cfg.max_ms, 60_000);
        assert_eq!(cfg.multiplier, 1.5);
        assert_eq!(cfg.jitter, 0.2);
    }
}
