use crate::fault::FaultInjector;
use crate::retry::{Retry, RetryPolicy};
use rand::rngs::SmallRng;
use stampede_core::{ConfigError, ErrorKind, FaultConfig, Outcome};
use std::fmt::Display;
use std::future::Future;
use tokio::time::Instant;

/// A unit of work the harness invokes repeatedly.
///
/// Any `Fn() -> impl Future<Output = Result<R, E>>` closure is an operation: the harness times
/// the call and records an [`ErrorKind::Invocation`] failure for `Err`. Implement the trait
/// directly to report a fully formed [`Outcome`] instead.
///
/// ```
/// use stampede::prelude::*;
///
/// async fn ping() -> Result<(), String> {
///     Ok(())
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let outcome = ping.call().await;
/// assert!(outcome.success);
/// # }
/// ```
pub trait Operation: Send + Sync + 'static {
    fn call(&self) -> impl Future<Output = Outcome> + Send;
}

impl<F, Fut, R, E> Operation for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send,
    E: Display,
{
    fn call(&self) -> impl Future<Output = Outcome> + Send {
        async move {
            let timestamp = Instant::now();
            let res = self().await;
            let latency = timestamp.elapsed();

            match res {
                Ok(_) => Outcome::success(latency, timestamp),
                Err(err) => {
                    Outcome::failure(ErrorKind::Invocation, err.to_string(), latency, timestamp)
                }
            }
        }
    }
}

/// Combinators for wrapping an [`Operation`].
pub trait OperationExt: Operation + Sized {
    /// Wrap in a [`FaultInjector`] drawing from `rng`.
    fn with_faults(
        self,
        config: FaultConfig,
        rng: SmallRng,
    ) -> Result<FaultInjector<Self>, ConfigError> {
        FaultInjector::new(self, config, rng)
    }

    /// Wrap in a [`Retry`] following `policy`.
    fn with_retry(self, policy: RetryPolicy) -> Result<Retry<Self>, ConfigError> {
        Retry::new(self, policy)
    }
}

impl<O: Operation> OperationExt for O {}
