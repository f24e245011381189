use crate::{
    ConfigError, DEFAULT_DEADLINE, DEFAULT_MAX_CONCURRENCY, DEFAULT_QUEUE_FACTOR,
    DEFAULT_SLOW_MULTIPLIER, DEFAULT_SLOW_OFFSET, DEFAULT_TIMEOUT_CEILING,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "serde")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::time::Duration;

// Float noise in `rate * duration` must not add a phantom arrival.
const COUNT_EPSILON: f64 = 1e-9;

/// How invocation attempts are scheduled over time.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LoadPattern {
    /// `count` invocations with no inter-arrival delay, bounded only by the worker pool.
    Burst { count: u64 },

    /// A fixed arrival rate (per second) held for `duration`.
    Sustained {
        rate: f64,
        #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
        duration: Duration,
    },

    /// Arrival rate rising (or falling) linearly from `start_rate` to `end_rate` over
    /// `duration`. Dispatch stops at `total_count` or `duration`, whichever comes first.
    RampUp {
        start_rate: f64,
        end_rate: f64,
        #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
        duration: Duration,
        total_count: u64,
    },

    /// Sustained stages run back to back.
    Steps(Vec<Stage>),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Stage {
    pub rate: f64,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub duration: Duration,
}

impl Stage {
    pub fn new(rate: f64, duration: Duration) -> Self {
        Self { rate, duration }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_rate(self.rate)?;
        validate_duration(self.duration)
    }

    fn expected_count(&self) -> u64 {
        arrivals_within(self.rate * self.duration.as_secs_f64())
    }
}

impl LoadPattern {
    pub fn burst(count: u64) -> Self {
        LoadPattern::Burst { count }
    }

    pub fn sustained(rate: f64, duration: Duration) -> Self {
        LoadPattern::Sustained { rate, duration }
    }

    pub fn ramp_up(start_rate: f64, end_rate: f64, duration: Duration, total_count: u64) -> Self {
        LoadPattern::RampUp {
            start_rate,
            end_rate,
            duration,
            total_count,
        }
    }

    pub fn steps(stages: impl IntoIterator<Item = Stage>) -> Self {
        LoadPattern::Steps(stages.into_iter().collect())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            LoadPattern::Burst { count } => validate_count(*count),
            LoadPattern::Sustained { rate, duration } => {
                validate_rate(*rate)?;
                validate_duration(*duration)
            }
            LoadPattern::RampUp {
                start_rate,
                end_rate,
                duration,
                total_count,
            } => {
                validate_rate(*start_rate)?;
                validate_rate(*end_rate)?;
                validate_duration(*duration)?;
                validate_count(*total_count)
            }
            LoadPattern::Steps(stages) => {
                if stages.is_empty() {
                    return Err(ConfigError::EmptySteps);
                }
                stages.iter().try_for_each(Stage::validate)
            }
        }
    }

    /// Number of arrivals a complete, uncancelled run dispatches.
    ///
    /// Assumes the pattern is valid.
    pub fn expected_count(&self) -> u64 {
        match self {
            LoadPattern::Burst { count } => *count,
            LoadPattern::Sustained { rate, duration } => {
                arrivals_within(rate * duration.as_secs_f64())
            }
            LoadPattern::RampUp {
                start_rate,
                end_rate,
                duration,
                total_count,
            } => {
                let area = (start_rate + end_rate) / 2. * duration.as_secs_f64();
                arrivals_within(area).min(*total_count)
            }
            LoadPattern::Steps(stages) => stages.iter().map(Stage::expected_count).sum(),
        }
    }

    /// Whether arrivals are paced by the coordinating loop, as opposed to a burst.
    pub fn is_paced(&self) -> bool {
        !matches!(self, LoadPattern::Burst { .. })
    }
}

/// Number of integer arrival indices `k >= 0` with `k < area`.
fn arrivals_within(area: f64) -> u64 {
    (area - COUNT_EPSILON).ceil().max(0.) as u64
}

fn validate_count(count: u64) -> Result<(), ConfigError> {
    if count == 0 {
        return Err(ConfigError::InvalidCount(count));
    }
    Ok(())
}

fn validate_rate(rate: f64) -> Result<(), ConfigError> {
    if !rate.is_finite() || rate <= 0. {
        return Err(ConfigError::InvalidRate(rate));
    }
    Ok(())
}

fn validate_duration(duration: Duration) -> Result<(), ConfigError> {
    if duration.is_zero() {
        return Err(ConfigError::ZeroDuration);
    }
    Ok(())
}

/// Synthetic failure a [`FaultConfig`] may inject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FailureKind {
    Timeout,
    ConnectionError,
    SlowResponse,
    PartialFailure,
    ServiceUnavailable,
    /// One of [`FailureKind::RANDOM_FAILURES`], chosen per invocation.
    Random,
}

impl FailureKind {
    /// The kinds `Random` resolves to. None of them reaches the wrapped operation.
    pub const RANDOM_FAILURES: [FailureKind; 3] = [
        FailureKind::Timeout,
        FailureKind::ConnectionError,
        FailureKind::ServiceUnavailable,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatencyRange {
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub min: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub max: Duration,
}

impl From<RangeInclusive<Duration>> for LatencyRange {
    fn from(range: RangeInclusive<Duration>) -> Self {
        let (min, max) = range.into_inner();
        Self { min, max }
    }
}

/// Probabilistic failure injection settings.
///
/// ```
/// use std::time::Duration;
/// use stampede_core::{FailureKind, FaultConfig};
///
/// let config = FaultConfig::new(0.1)
///     .kinds([FailureKind::Timeout, FailureKind::ConnectionError])
///     .timeout_ceiling(Duration::from_secs(1));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaultConfig {
    pub failure_rate: f64,
    pub failure_kinds: BTreeSet<FailureKind>,
    /// Pad added to pass-through invocations.
    pub injected_latency: Option<LatencyRange>,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub timeout_ceiling: Duration,
    pub slow_multiplier: f64,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub slow_offset: Duration,
}

impl FaultConfig {
    pub fn new(failure_rate: f64) -> Self {
        Self {
            failure_rate,
            failure_kinds: BTreeSet::from([FailureKind::Random]),
            injected_latency: None,
            timeout_ceiling: DEFAULT_TIMEOUT_CEILING,
            slow_multiplier: DEFAULT_SLOW_MULTIPLIER,
            slow_offset: DEFAULT_SLOW_OFFSET,
        }
    }

    /// Replace the configured failure kinds.
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = FailureKind>) -> Self {
        self.failure_kinds = kinds.into_iter().collect();
        self
    }

    pub fn injected_latency(mut self, range: impl Into<LatencyRange>) -> Self {
        self.injected_latency = Some(range.into());
        self
    }

    pub fn timeout_ceiling(mut self, ceiling: Duration) -> Self {
        self.timeout_ceiling = ceiling;
        self
    }

    pub fn slow_response(mut self, multiplier: f64, offset: Duration) -> Self {
        self.slow_multiplier = multiplier;
        self.slow_offset = offset;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.failure_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(ConfigError::FailureRateOutOfRange(rate));
        }
        if rate > 0. && self.failure_kinds.is_empty() {
            return Err(ConfigError::NoFailureKinds(rate));
        }
        if let Some(LatencyRange { min, max }) = self.injected_latency {
            if min > max {
                return Err(ConfigError::InvertedLatencyRange { min, max });
            }
        }
        if self.timeout_ceiling.is_zero() {
            return Err(ConfigError::ZeroTimeoutCeiling);
        }
        if !self.slow_multiplier.is_finite() || self.slow_multiplier < 1. {
            return Err(ConfigError::InvalidMultiplier(self.slow_multiplier));
        }
        Ok(())
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::new(0.)
    }
}

/// Everything needed to run one load scenario, apart from the operation itself.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScenarioConfig {
    pub name: String,
    pub pattern: Option<LoadPattern>,
    pub max_concurrency: usize,
    /// Defaults to a multiple of `max_concurrency` when unset.
    pub queue_capacity: Option<usize>,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub deadline: Duration,
    pub faults: Option<FaultConfig>,
    /// Seed for the fault injector. Entropy is used when unset.
    pub fault_seed: Option<u64>,
}

impl ScenarioConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            queue_capacity: None,
            deadline: DEFAULT_DEADLINE,
            faults: None,
            fault_seed: None,
        }
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(self.max_concurrency.saturating_mul(DEFAULT_QUEUE_FACTOR))
    }

    /// Validate the whole configuration, returning the load pattern to run.
    pub fn validate(&self) -> Result<&LoadPattern, ConfigError> {
        let pattern = self.pattern.as_ref().ok_or(ConfigError::MissingPattern)?;
        pattern.validate()?;

        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.queue_capacity() == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.deadline.is_zero() {
            return Err(ConfigError::ZeroDeadline);
        }
        if let Some(faults) = &self.faults {
            faults.validate()?;
        }
        Ok(pattern)
    }
}
