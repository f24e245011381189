//! Scenario builder
use crate::engine::run_scenario;
use crate::operation::Operation;
use stampede_core::{
    ConfigError, FaultConfig, LoadPattern, Outcome, ResultSummary, ScenarioConfig, Stage,
    DEFAULT_OUTCOME_BUFFER,
};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Load scenario handle
///
/// Configure it with the [`ConfigurableScenario`] methods, then `.await` it to run. Created with
/// [`scenario`].
#[pin_project::pin_project]
pub struct Scenario<O> {
    operation: Option<O>,
    runner_fut: Option<Pin<Box<dyn Future<Output = Result<ResultSummary, ConfigError>> + Send>>>,
    config: ScenarioConfig,
    cancel: CancellationToken,
    outcomes: Option<broadcast::Sender<Outcome>>,
}

/// Create a scenario named `name` invoking `operation`.
pub fn scenario<O: Operation>(name: &str, operation: O) -> Scenario<O> {
    Scenario::new(name, operation)
}

impl<O: Operation> Scenario<O> {
    pub fn new(name: &str, operation: O) -> Self {
        Self {
            operation: Some(operation),
            runner_fut: None,
            config: ScenarioConfig::new(name),
            cancel: CancellationToken::new(),
            outcomes: Some(broadcast::channel(DEFAULT_OUTCOME_BUFFER).0),
        }
    }

    /// Receive every outcome as it is observed.
    ///
    /// Subscribers that fall behind by more than the buffer lag rather than stall the run. The
    /// stream closes once the run completes.
    pub fn subscribe(&self) -> broadcast::Receiver<Outcome> {
        match &self.outcomes {
            Some(outcomes) => outcomes.subscribe(),
            // Already running; hand back a closed stream.
            None => broadcast::channel(1).1,
        }
    }

    /// Token that cancels this scenario.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

impl<O: Operation> Future for Scenario<O> {
    type Output = Result<ResultSummary, ConfigError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        if let Some(operation) = this.operation.take() {
            let config = this.config.clone();
            let cancel = this.cancel.clone();
            let stream = this
                .outcomes
                .take()
                .filter(|outcomes| outcomes.receiver_count() > 0);
            *this.runner_fut = Some(Box::pin(run_scenario(operation, config, cancel, stream)));
        }

        if let Some(runner) = this.runner_fut {
            runner.as_mut().poll(cx)
        } else {
            unreachable!()
        }
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn burst(self, count: u64) -> Self;
    fn sustained(self, rate: f64, duration: Duration) -> Self;
    fn ramp_up(self, start_rate: f64, end_rate: f64, duration: Duration, total_count: u64)
        -> Self;
    fn steps(self, stages: impl IntoIterator<Item = Stage>) -> Self;
    fn pattern(self, pattern: LoadPattern) -> Self;
    fn max_concurrency(self, max_concurrency: usize) -> Self;
    fn queue_capacity(self, capacity: usize) -> Self;
    fn deadline(self, deadline: Duration) -> Self;
    fn faults(self, faults: FaultConfig) -> Self;
    fn fault_seed(self, seed: u64) -> Self;
    fn cancel_on(self, token: CancellationToken) -> Self;
}

impl<O: Operation> ConfigurableScenario<Result<ResultSummary, ConfigError>> for Scenario<O> {
    /// Issue `count` invocations as fast as the worker pool allows.
    ///
    /// # Example
    /// ```no_run
    /// use stampede::prelude::*;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let summary = scenario("burst", || async { Ok::<_, String>(()) })
    ///         .burst(100)
    ///         .max_concurrency(10)
    ///         .await
    ///         .unwrap();
    ///     assert_eq!(summary.total, 100);
    /// }
    /// ```
    fn burst(mut self, count: u64) -> Self {
        self.config.pattern = Some(LoadPattern::burst(count));
        self
    }

    /// Hold `rate` arrivals per second for `duration`.
    ///
    /// # Example
    /// ```no_run
    /// use stampede::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     scenario("steady", || async { Ok::<_, String>(()) })
    ///         .sustained(20., Duration::from_secs(5))
    ///         .await
    ///         .unwrap();
    /// }
    /// ```
    fn sustained(mut self, rate: f64, duration: Duration) -> Self {
        self.config.pattern = Some(LoadPattern::sustained(rate, duration));
        self
    }

    /// Interpolate the arrival rate from `start_rate` to `end_rate` over `duration`, stopping
    /// early after `total_count` arrivals.
    fn ramp_up(
        mut self,
        start_rate: f64,
        end_rate: f64,
        duration: Duration,
        total_count: u64,
    ) -> Self {
        self.config.pattern = Some(LoadPattern::ramp_up(
            start_rate,
            end_rate,
            duration,
            total_count,
        ));
        self
    }

    /// Run sustained stages back to back.
    fn steps(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.config.pattern = Some(LoadPattern::steps(stages));
        self
    }

    fn pattern(mut self, pattern: LoadPattern) -> Self {
        self.config.pattern = Some(pattern);
        self
    }

    fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Bound on arrivals waiting for a worker. Paced arrivals beyond it are recorded as
    /// `QueueOverflow`.
    fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Abandon any single invocation running longer than `deadline`.
    fn deadline(mut self, deadline: Duration) -> Self {
        self.config.deadline = deadline;
        self
    }

    /// Inject failures into every invocation.
    ///
    /// # Example
    /// ```no_run
    /// use stampede::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let summary = scenario("chaos", || async { Ok::<_, String>(()) })
    ///         .sustained(20., Duration::from_secs(5))
    ///         .faults(FaultConfig::new(0.1).kinds([FailureKind::Timeout]))
    ///         .fault_seed(42)
    ///         .await
    ///         .unwrap();
    ///     println!("{summary}");
    /// }
    /// ```
    fn faults(mut self, faults: FaultConfig) -> Self {
        self.config.faults = Some(faults);
        self
    }

    fn fault_seed(mut self, seed: u64) -> Self {
        self.config.fault_seed = Some(seed);
        self
    }

    /// Cancel the run when `token` is cancelled.
    fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }
}
