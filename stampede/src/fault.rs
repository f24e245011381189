//! Probabilistic failure injection around an [`Operation`].
use crate::operation::Operation;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use stampede_core::{ConfigError, ErrorKind, FailureKind, FaultConfig, LatencyRange, Outcome};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Wraps an operation so that each invocation fails with probability `failure_rate`.
///
/// The randomness source is owned by the injector; build it with [`FaultInjector::seeded`] for
/// reproducible runs.
pub struct FaultInjector<O> {
    operation: O,
    config: FaultConfig,
    kinds: Vec<FailureKind>,
    rng: Mutex<SmallRng>,
}

/// What a single invocation will do, drawn up front.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Plan {
    Delegate { pad: Duration },
    Timeout,
    ConnectionError,
    ServiceUnavailable,
    SlowResponse,
    PartialFailure,
}

/// Wrap `operation` with fault injection drawing from `rng`.
pub fn inject<O: Operation>(
    operation: O,
    config: FaultConfig,
    rng: SmallRng,
) -> Result<FaultInjector<O>, ConfigError> {
    FaultInjector::new(operation, config, rng)
}

impl<O: Operation> FaultInjector<O> {
    pub fn new(operation: O, config: FaultConfig, rng: SmallRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let kinds = config.failure_kinds.iter().copied().collect();
        Ok(Self {
            operation,
            config,
            kinds,
            rng: Mutex::new(rng),
        })
    }

    pub fn seeded(operation: O, config: FaultConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::new(operation, config, SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy(operation: O, config: FaultConfig) -> Result<Self, ConfigError> {
        Self::new(operation, config, SmallRng::from_entropy())
    }

    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    pub fn inner(&self) -> &O {
        &self.operation
    }

    // Every draw for one invocation happens under this single lock.
    fn plan(&self) -> Plan {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let r: f64 = rng.gen();
        if r < self.config.failure_rate {
            if let Some(kind) = self.kinds.choose(&mut *rng).copied() {
                let kind = match kind {
                    FailureKind::Random => FailureKind::RANDOM_FAILURES
                        .choose(&mut *rng)
                        .copied()
                        .unwrap_or(FailureKind::ConnectionError),
                    kind => kind,
                };
                return match kind {
                    FailureKind::Timeout => Plan::Timeout,
                    FailureKind::ConnectionError | FailureKind::Random => Plan::ConnectionError,
                    FailureKind::ServiceUnavailable => Plan::ServiceUnavailable,
                    FailureKind::SlowResponse => Plan::SlowResponse,
                    FailureKind::PartialFailure => Plan::PartialFailure,
                };
            }
        }

        let pad = match self.config.injected_latency {
            Some(LatencyRange { min, max }) => rng.gen_range(min..=max),
            None => Duration::ZERO,
        };
        Plan::Delegate { pad }
    }

    async fn execute(&self, plan: Plan) -> Outcome {
        let timestamp = Instant::now();
        match plan {
            Plan::Delegate { pad } => {
                let outcome = self.operation.call().await;
                if pad.is_zero() {
                    return outcome;
                }
                sleep(pad).await;
                let latency = outcome.latency + pad;
                outcome.with_latency(latency)
            }
            Plan::Timeout => {
                let ceiling = self.config.timeout_ceiling;
                sleep(ceiling).await;
                Outcome::failure(
                    ErrorKind::Timeout,
                    format!(
                        "injected timeout after {}",
                        humantime::format_duration(ceiling)
                    ),
                    ceiling,
                    timestamp,
                )
            }
            Plan::ConnectionError => Outcome::failure(
                ErrorKind::ConnectionError,
                "injected connection error",
                timestamp.elapsed(),
                timestamp,
            ),
            Plan::ServiceUnavailable => Outcome::failure(
                ErrorKind::ServiceUnavailable,
                "injected service unavailable",
                timestamp.elapsed(),
                timestamp,
            ),
            Plan::SlowResponse => {
                let outcome = self.operation.call().await;
                let slowed = outcome
                    .latency
                    .mul_f64(self.config.slow_multiplier)
                    .saturating_add(self.config.slow_offset);
                sleep(slowed.saturating_sub(outcome.latency)).await;

                let outcome = outcome.with_latency(slowed);
                if outcome.success {
                    outcome.tagged(ErrorKind::SlowResponse, "injected slow response")
                } else {
                    outcome
                }
            }
            Plan::PartialFailure => {
                let outcome = self.operation.call().await;
                Outcome::failure(
                    ErrorKind::PartialFailure,
                    "injected partial failure: operation only partially completed",
                    outcome.latency,
                    outcome.timestamp,
                )
            }
        }
    }
}

impl<O: Operation> Operation for FaultInjector<O> {
    async fn call(&self) -> Outcome {
        let plan = self.plan();
        trace!("Fault plan {plan:?}");
        self.execute(plan).await
    }
}
