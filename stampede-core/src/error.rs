use std::time::Duration;
use thiserror::Error;

/// Invalid run parameters. Raised before any invocation is scheduled and never retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("No load pattern configured. Use one of `.burst()`/`.sustained()`/`.ramp_up()`/`.steps()`")]
    MissingPattern,

    #[error("Invocation count must be at least 1, got {0}")]
    InvalidCount(u64),

    #[error("Arrival rate must be finite and greater than 0, got {0}")]
    InvalidRate(f64),

    #[error("Pattern duration must be greater than 0")]
    ZeroDuration,

    #[error("Step pattern has no stages")]
    EmptySteps,

    #[error("Max concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("Queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("Per-invocation deadline must be greater than 0")]
    ZeroDeadline,

    #[error("Failure rate must be within [0, 1], got {0}")]
    FailureRateOutOfRange(f64),

    #[error("Failure rate of {0} requires at least one failure kind")]
    NoFailureKinds(f64),

    #[error("Injected latency range is inverted ({min:?} > {max:?})")]
    InvertedLatencyRange { min: Duration, max: Duration },

    #[error("Injected timeout ceiling must be greater than 0")]
    ZeroTimeoutCeiling,

    #[error("Multiplier must be finite and at least 1.0, got {0}")]
    InvalidMultiplier(f64),
}
