//! ExecutorConfig: retry policy and slow-query logging threshold.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    slow_query_threshold: Duration,
    max_retries: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: u32,
}

impl ExecutorConfig {
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::default()
    }

    pub fn slow_query_threshold(&self) -> Duration {
        self.slow_query_threshold
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn initial_delay_ms(&self) -> u64 {
        self.initial_delay_ms
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms
    }

    pub fn backoff_multiplier(&self) -> u32 {
        self.backoff_multiplier
    }

    /// Exponential backoff for the given 0-based retry attempt (0 is the
    /// first retry): `initial_delay_ms * backoff_multiplier^attempt`, capped
    /// at `max_delay_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.saturating_pow(attempt) as u64;
        let delay_ms = self.initial_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        ExecutorConfigBuilder::default().build()
    }
}

pub struct ExecutorConfigBuilder {
    slow_query_threshold: Duration,
    max_retries: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    backoff_multiplier: u32,
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(500),
            max_retries: 2,
            initial_delay_ms: 50,
            max_delay_ms: 2_000,
            backoff_multiplier: 2,
        }
    }
}

impl ExecutorConfigBuilder {
    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
        self.initial_delay_ms = initial_delay_ms;
        self
    }

    pub fn max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn backoff_multiplier(mut self, backoff_multiplier: u32) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn build(self) -> ExecutorConfig {
        ExecutorConfig {
            slow_query_threshold: self.slow_query_threshold,
            max_retries: self.max_retries,
            initial_delay_ms: self.initial_delay_ms,
            max_delay_ms: self.max_delay_ms,
            backoff_multiplier: self.backoff_multiplier,
        }
    }
}
