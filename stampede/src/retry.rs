use crate::operation::Operation;
use stampede_core::{ConfigError, Outcome};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::sleep;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Exponential backoff settings for [`Retry`].
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: NonZeroU32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            base_delay: Duration::from_millis(500),
            multiplier: 2.,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: NonZeroU32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 1. {
            return Err(ConfigError::InvalidMultiplier(self.multiplier));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (zero based), capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Retries failed outcomes of the wrapped operation.
///
/// The recorded outcome is the first success or the last failure. Its latency covers every
/// attempt plus the backoff in between, and its timestamp is that of the first attempt.
pub struct Retry<O> {
    operation: O,
    policy: RetryPolicy,
}

impl<O: Operation> Retry<O> {
    pub fn new(operation: O, policy: RetryPolicy) -> Result<Self, ConfigError> {
        policy.validate()?;
        Ok(Self { operation, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<O: Operation> Operation for Retry<O> {
    async fn call(&self) -> Outcome {
        let mut outcome = self.operation.call().await;
        let first_attempt = outcome.timestamp;
        let mut total = outcome.latency;

        for retry in 1..self.policy.max_attempts.get() {
            if outcome.success {
                break;
            }

            let delay = self.policy.backoff(retry - 1);
            debug!("Attempt {retry} failed ({outcome}); retrying in {delay:?}");
            sleep(delay).await;

            outcome = self.operation.call().await;
            total += delay + outcome.latency;
        }

        Outcome {
            timestamp: first_attempt,
            ..outcome
        }
        .with_latency(total)
    }
}
