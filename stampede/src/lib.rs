#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod aggregator;
mod engine;
mod fault;
mod operation;
mod retry;
pub mod scenario;

pub use aggregator::Aggregator;
pub use engine::run;
pub use fault::{inject, FaultInjector};
pub use operation::{Operation, OperationExt};
pub use retry::{Retry, RetryPolicy};
pub use scenario::{scenario, ConfigurableScenario, Scenario};

pub use stampede_core::{
    ConfigError, ErrorKind, FailureKind, FaultConfig, LatencyRange, LatencyStats, LoadPattern,
    Outcome, OutcomeError, ResultSummary, ScenarioConfig, Stage,
};
pub use tokio_util::sync::CancellationToken;

pub mod prelude {
    pub use crate::scenario::{scenario, ConfigurableScenario};
    pub use crate::{FaultInjector, Operation, OperationExt, Retry, RetryPolicy};
    pub use stampede_core::{
        ConfigError, ErrorKind, FailureKind, FaultConfig, LoadPattern, Outcome, ResultSummary,
        ScenarioConfig, Stage,
    };
    pub use tokio_util::sync::CancellationToken;
}
