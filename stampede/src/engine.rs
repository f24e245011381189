//! Load engine: validates a run, dispatches arrivals and drains the worker pool.
use crate::aggregator::Aggregator;
use crate::fault::FaultInjector;
use crate::operation::Operation;
use async_channel::Sender;
use pacer::Pacer;
use pool::{Arrival, WorkerPool};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use stampede_core::{ConfigError, LoadPattern, Outcome, ResultSummary, ScenarioConfig};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

mod pacer;
mod pool;

/// Run `operation` under `config` until the pattern completes or `cancel` fires.
///
/// Configuration is validated before anything is scheduled; that is the only error. Failed
/// invocations are recorded in the summary.
///
/// ```no_run
/// use stampede::prelude::*;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), ConfigError> {
/// let mut config = ScenarioConfig::new("checkout");
/// config.pattern = Some(LoadPattern::sustained(20., Duration::from_secs(5)));
///
/// let summary = stampede::run(
///     || async { Ok::<_, String>(()) },
///     config,
///     CancellationToken::new(),
/// )
/// .await?;
/// println!("{summary}");
/// # Ok(())
/// # }
/// ```
pub async fn run<O: Operation>(
    operation: O,
    config: ScenarioConfig,
    cancel: CancellationToken,
) -> Result<ResultSummary, ConfigError> {
    run_scenario(operation, config, cancel, None).await
}

#[instrument(name = "scenario", skip_all, fields(name = config.name.as_str()))]
pub(crate) async fn run_scenario<O: Operation>(
    operation: O,
    config: ScenarioConfig,
    cancel: CancellationToken,
    stream: Option<broadcast::Sender<Outcome>>,
) -> Result<ResultSummary, ConfigError> {
    info!("Running {} with config {:?}", config.name, &config);

    let pattern = config.validate()?.clone();
    let summary = match &config.faults {
        Some(faults) => {
            let rng = match config.fault_seed {
                Some(seed) => SmallRng::seed_from_u64(seed),
                None => SmallRng::from_entropy(),
            };
            let operation = FaultInjector::new(operation, faults.clone(), rng)?;
            drive(operation, pattern, &config, cancel, stream).await
        }
        None => drive(operation, pattern, &config, cancel, stream).await,
    };

    info!("Scenario complete: {summary}");
    Ok(summary)
}

async fn drive<O: Operation>(
    operation: O,
    pattern: LoadPattern,
    config: &ScenarioConfig,
    cancel: CancellationToken,
    stream: Option<broadcast::Sender<Outcome>>,
) -> ResultSummary {
    let mut aggregator = Aggregator::new().labelled(&config.name);
    if let Some(stream) = stream {
        aggregator = aggregator.with_stream(stream);
    }
    let aggregator = Arc::new(aggregator);

    let (tx, rx) = async_channel::bounded(config.queue_capacity());
    let pool = WorkerPool::spawn(
        Arc::new(operation),
        rx,
        aggregator.clone(),
        config.max_concurrency,
        config.deadline,
        cancel.clone(),
    );
    debug!(
        "Spawned {} workers, queue capacity {}",
        pool.size(),
        config.queue_capacity()
    );

    let dispatched = match pattern {
        LoadPattern::Burst { count } => dispatch_burst(count, &tx, &cancel).await,
        pattern => {
            let pacer = Pacer::new(pattern);
            info!("Pacing {pacer}");
            pacer.dispatch(&tx, &aggregator, &cancel).await
        }
    };
    tx.close();
    debug!("Dispatched {dispatched} arrivals; draining");

    pool.join().await;

    if cancel.is_cancelled() {
        warn!("Scenario cancelled after {} outcomes", aggregator.observed());
        aggregator.mark_cancelled();
    }

    match Arc::try_unwrap(aggregator) {
        Ok(aggregator) => aggregator.finalize(),
        Err(aggregator) => aggregator.summarize(),
    }
}

/// Queue `count` arrivals as fast as the pool takes them. Nothing is dropped.
async fn dispatch_burst(count: u64, arrivals: &Sender<Arrival>, cancel: &CancellationToken) -> u64 {
    let mut dispatched = 0;
    for index in 0..count {
        let arrival = Arrival {
            index,
            due: Instant::now(),
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            res = arrivals.send(arrival) => {
                if res.is_err() {
                    error!("Arrival queue closed during burst");
                    break;
                }
            }
        }
        dispatched += 1;
    }
    dispatched
}
