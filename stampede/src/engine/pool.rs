use crate::aggregator::Aggregator;
use crate::operation::Operation;
use async_channel::Receiver;
use stampede_core::{ErrorKind, Outcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// One scheduled invocation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Arrival {
    pub index: u64,
    pub due: Instant,
}

/// Fixed set of workers pulling arrivals off a bounded queue.
pub(crate) struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    pub fn spawn<O: Operation>(
        operation: Arc<O>,
        arrivals: Receiver<Arrival>,
        aggregator: Arc<Aggregator>,
        concurrency: usize,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let mut workers = JoinSet::new();
        for id in 0..concurrency {
            let worker = Worker {
                id,
                operation: operation.clone(),
                arrivals: arrivals.clone(),
                aggregator: aggregator.clone(),
                deadline,
                cancel: cancel.clone(),
            };
            workers.spawn(worker.run());
        }
        Self { workers }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to drain and exit.
    pub async fn join(mut self) {
        while let Some(res) = self.workers.join_next().await {
            if let Err(err) = res {
                error!("Worker exited abnormally: {err}");
            }
        }
    }
}

struct Worker<O> {
    id: usize,
    operation: Arc<O>,
    arrivals: Receiver<Arrival>,
    aggregator: Arc<Aggregator>,
    deadline: Duration,
    cancel: CancellationToken,
}

impl<O: Operation> Worker<O> {
    async fn run(self) {
        let mut completed = 0u64;
        loop {
            // Queued arrivals are discarded once cancelled; an in-flight invocation is not.
            let arrival = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                arrival = self.arrivals.recv() => match arrival {
                    Ok(arrival) => arrival,
                    Err(_) => break,
                },
            };

            trace!(
                "Worker {} picked up arrival {} ({:?} late)",
                self.id,
                arrival.index,
                arrival.due.elapsed()
            );
            let outcome = invoke(&self.operation, self.deadline).await;
            self.aggregator.observe(outcome);
            completed += 1;
        }
        trace!("Worker {} done after {completed} invocations", self.id);
    }
}

/// Run one invocation on its own task, abandoning it at `deadline`.
///
/// The task is aborted if this future is dropped first.
pub(crate) async fn invoke<O: Operation>(operation: &Arc<O>, deadline: Duration) -> Outcome {
    let started = Instant::now();
    let operation = operation.clone();
    let mut handle = AbortOnDropHandle::new(tokio::spawn(async move { operation.call().await }));

    match timeout(deadline, &mut handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(err)) => Outcome::failure(
            ErrorKind::Invocation,
            format!("operation did not complete: {err}"),
            started.elapsed(),
            started,
        ),
        Err(_) => {
            handle.abort();
            debug!("Invocation abandoned after {deadline:?}");
            Outcome::failure(ErrorKind::Timeout, "deadline exceeded", deadline, started)
        }
    }
}
