use stampede_core::{ErrorKind, LatencyStats, Outcome, ResultSummary};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Collects outcomes from concurrent workers and summarizes them.
///
/// Each [`Aggregator::observe`] is a single critical section. Statistics do not depend on the
/// order outcomes arrive in.
pub struct Aggregator {
    state: Mutex<State>,
    stream: Option<broadcast::Sender<Outcome>>,
    started: Instant,
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    label: String,
}

#[derive(Default)]
struct State {
    success: u64,
    failure: u64,
    latencies: Vec<Duration>,
    errors: BTreeMap<ErrorKind, u64>,
    cancelled: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            stream: None,
            started: Instant::now(),
            label: String::new(),
        }
    }

    /// Forward every observed outcome to `sender`.
    pub fn with_stream(mut self, sender: broadcast::Sender<Outcome>) -> Self {
        self.stream = Some(sender);
        self
    }

    /// Scenario label attached to recorded metrics.
    pub fn labelled(mut self, name: &str) -> Self {
        self.label = name.to_string();
        self
    }

    pub fn observe(&self, outcome: Outcome) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if outcome.success {
                state.success += 1;
            } else {
                state.failure += 1;
            }
            if outcome.was_invoked() {
                state.latencies.push(outcome.latency);
            }
            if let Some(kind) = outcome.kind() {
                *state.errors.entry(kind).or_default() += 1;
            }
        }

        #[cfg(feature = "metrics")]
        self.record_metrics(&outcome);

        if let Some(stream) = &self.stream {
            // No subscribers is fine.
            let _ = stream.send(outcome);
        }
    }

    pub fn mark_cancelled(&self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancelled = true;
    }

    pub fn observed(&self) -> u64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.success + state.failure
    }

    /// Summary of everything observed so far.
    pub fn summarize(&self) -> ResultSummary {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let mut latencies = state.latencies.clone();
        ResultSummary::new(
            state.success,
            state.failure,
            LatencyStats::from_samples(&mut latencies),
            state.errors.clone(),
            self.started.elapsed(),
            state.cancelled,
        )
    }

    /// Close the outcome stream and produce the final summary.
    pub fn finalize(self) -> ResultSummary {
        let elapsed = self.started.elapsed();
        let mut state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        ResultSummary::new(
            state.success,
            state.failure,
            LatencyStats::from_samples(&mut state.latencies),
            state.errors,
            elapsed,
            state.cancelled,
        )
    }

    #[cfg(feature = "metrics")]
    fn record_metrics(&self, outcome: &Outcome) {
        let result = if outcome.success { "success" } else { "failure" };
        let kind = outcome.kind().map(|k| k.as_str()).unwrap_or("none");

        metrics::counter!(
            "stampede_outcomes_total",
            "scenario" => self.label.clone(),
            "result" => result,
            "kind" => kind
        )
        .increment(1);

        if outcome.was_invoked() {
            metrics::histogram!("stampede_latency_seconds", "scenario" => self.label.clone())
                .record(outcome.latency.as_secs_f64());
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}
