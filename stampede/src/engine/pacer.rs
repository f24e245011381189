use super::pool::Arrival;
use crate::aggregator::Aggregator;
use async_channel::{Sender, TrySendError};
use stampede_core::{LoadPattern, Outcome, Stage};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Single coordinating loop deciding when each arrival of a paced pattern is due.
///
/// Offsets come from inverting the cumulative arrival count `N(t)`, so the schedule does not
/// drift with loop latency.
pub(crate) struct Pacer {
    pattern: LoadPattern,
    count: u64,
}

impl Pacer {
    pub fn new(pattern: LoadPattern) -> Self {
        let count = pattern.expected_count();
        Self { pattern, count }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Offset from the start of the run at which arrival `index` is due.
    pub fn offset(&self, index: u64) -> Option<Duration> {
        if index >= self.count {
            return None;
        }
        let k = index as f64;

        let secs = match &self.pattern {
            LoadPattern::Burst { .. } => 0.,
            LoadPattern::Sustained { rate, .. } => k / rate,
            LoadPattern::RampUp {
                start_rate: s,
                end_rate: e,
                duration,
                ..
            } => {
                // Positive root of N(t) = s*t + (e - s)*t^2 / 2D = k.
                let span = duration.as_secs_f64();
                let discriminant = s * s + 2. * (e - s) * k / span;
                if discriminant < 0. {
                    return None;
                }
                2. * k / (s + discriminant.sqrt())
            }
            LoadPattern::Steps(stages) => return steps_offset(stages, index),
        };

        Duration::try_from_secs_f64(secs).ok()
    }

    /// Dispatch every arrival at its due time until done or cancelled.
    ///
    /// An arrival finding the queue full is recorded as a `QueueOverflow` outcome. Returns the
    /// number of arrivals handled.
    pub async fn dispatch(
        &self,
        arrivals: &Sender<Arrival>,
        aggregator: &Aggregator,
        cancel: &CancellationToken,
    ) -> u64 {
        let start = Instant::now();
        let mut handled = 0;

        for index in 0..self.count() {
            let Some(offset) = self.offset(index) else {
                break;
            };
            let due = start + offset;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Pacer cancelled after {handled} arrivals");
                    break;
                }
                _ = sleep_until(due) => {}
            }

            match arrivals.try_send(Arrival { index, due }) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    trace!("Arrival {index} overflowed the queue");
                    aggregator.observe(Outcome::queue_overflow(Instant::now()));
                }
                Err(TrySendError::Closed(_)) => {
                    error!("Arrival queue closed while dispatching");
                    break;
                }
            }
            handled += 1;
        }

        handled
    }
}

fn steps_offset(stages: &[Stage], index: u64) -> Option<Duration> {
    let mut base = 0;
    let mut start = Duration::ZERO;
    for stage in stages {
        let count = LoadPattern::Sustained {
            rate: stage.rate,
            duration: stage.duration,
        }
        .expected_count();

        if index < base + count {
            let local = (index - base) as f64 / stage.rate;
            return Duration::try_from_secs_f64(local).ok().map(|d| start + d);
        }
        base += count;
        start += stage.duration;
    }
    None
}

impl std::fmt::Display for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        match &self.pattern {
            LoadPattern::Burst { count } => write!(f, "burst of {count}"),
            LoadPattern::Sustained { rate, duration } => {
                write!(f, "{rate}/s for {}", humantime::format_duration(*duration))
            }
            LoadPattern::RampUp {
                start_rate,
                end_rate,
                duration,
                ..
            } => write!(
                f,
                "{start_rate}/s to {end_rate}/s over {}, {} arrivals",
                humantime::format_duration(*duration),
                self.count
            ),
            LoadPattern::Steps(stages) => write!(f, "{} stages, {} arrivals", stages.len(), self.count),
        }
    }
}
