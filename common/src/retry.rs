// Retry strategy with exponential backoff and jitter
// Only idempotent remote calls go through a retry loop; the default policy never retries.

use rand::Rng;
use std::time::Duration;

use crate::config::RetryConfig;

/// Retry strategy trait for calculating retry delays
pub trait RetryStrategy: Send + Sync + std::fmt::Debug {
    /// Delay before retry number `attempt` (0-based), None once retries are exhausted
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    fn max_retries(&self) -> u32;

    fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries()
    }
}

/// Single-shot policy
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetry;

impl RetryStrategy for NoRetry {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn max_retries(&self) -> u32 {
        0
    }
}

/// Exponential backoff retry strategy with jitter
/// Sequence: base, 2x base, 4x base, ... capped at max_delay
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    jitter_factor: f64,
}

impl ExponentialBackoff {
    pub fn new(max_retries: u32, base_delay_ms: u64, max_delay_ms: u64, jitter_factor: f64) -> Self {
        Self {
            max_retries,
            base_delay_ms,
            max_delay_ms,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
        }
    }

    fn calculate_base_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 2_u64.checked_pow(attempt).unwrap_or(u64::MAX);
        self.base_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms)
    }

    fn add_jitter_ms(&self, base_delay_ms: u64) -> u64 {
        let jitter_range_ms = (base_delay_ms as f64 * self.jitter_factor) as u64;
        if jitter_range_ms == 0 {
            return base_delay_ms;
        }
        base_delay_ms + rand::thread_rng().gen_range(0..=jitter_range_ms)
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }
        let base = self.calculate_base_delay_ms(attempt);
        Some(Duration::from_millis(self.add_jitter_ms(base)))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Build the policy described by configuration
pub fn from_config(config: &RetryConfig) -> Box<dyn RetryStrategy> {
    if config.max_retries == 0 {
        Box::new(NoRetry)
    } else {
        Box::new(ExponentialBackoff::new(
            config.max_retries,
            config.base_delay_ms,
            config.max_delay_ms,
            config.jitter_factor,
        ))
    }
}
