use crate::ErrorKind;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
#[cfg(feature = "serde")]
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Latency statistics over every sample collected during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatencyStats {
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub min: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub max: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub mean: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub p50: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub p95: Duration,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub p99: Duration,
}

impl LatencyStats {
    /// Exact statistics over `samples`, or `None` when there are none.
    ///
    /// Sorts `samples` in place.
    pub fn from_samples(samples: &mut [Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        let total: Duration = samples.iter().sum();
        let mean = total / samples.len() as u32;

        Some(Self {
            min: samples[0],
            max: samples[samples.len() - 1],
            mean,
            p50: percentile(samples, 50.),
            p95: percentile(samples, 95.),
            p99: percentile(samples, 99.),
        })
    }
}

/// Nearest-rank percentile of a sorted, non-empty slice.
pub fn percentile(sorted: &[Duration], p: f64) -> Duration {
    let rank = (p / 100. * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Aggregate statistics for one run. Produced once and never mutated by the harness afterwards.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", cfg_eval::cfg_eval, serde_as)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ResultSummary {
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// `success_count / total`, or 0 for an empty run.
    pub success_rate: f64,
    /// `None` when no invocation produced a latency sample.
    pub latency: Option<LatencyStats>,
    pub errors: BTreeMap<ErrorKind, u64>,
    #[cfg_attr(feature = "serde", serde_as(as = "DurationSecondsWithFrac<f64>"))]
    pub elapsed: Duration,
    /// Outcomes per second of elapsed time.
    pub throughput: f64,
    pub cancelled: bool,
}

impl ResultSummary {
    pub fn new(
        success_count: u64,
        failure_count: u64,
        latency: Option<LatencyStats>,
        errors: BTreeMap<ErrorKind, u64>,
        elapsed: Duration,
        cancelled: bool,
    ) -> Self {
        let total = success_count + failure_count;
        let success_rate = if total == 0 {
            0.
        } else {
            success_count as f64 / total as f64
        };
        let throughput = if elapsed.is_zero() {
            0.
        } else {
            total as f64 / elapsed.as_secs_f64()
        };

        Self {
            total,
            success_count,
            failure_count,
            success_rate,
            latency,
            errors,
            elapsed,
            throughput,
            cancelled,
        }
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors.get(&kind).copied().unwrap_or(0)
    }

    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            0.
        } else {
            1. - self.success_rate
        }
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} outcomes ({} ok, {} failed, {:.1}% success) in {} at {:.1}/s",
            self.total,
            self.success_count,
            self.failure_count,
            self.success_rate * 100.,
            humantime::format_duration(self.elapsed),
            self.throughput,
        )?;

        if let Some(latency) = &self.latency {
            write!(
                f,
                "; latency p50={} p95={} p99={} max={}",
                humantime::format_duration(latency.p50),
                humantime::format_duration(latency.p95),
                humantime::format_duration(latency.p99),
                humantime::format_duration(latency.max),
            )?;
        }

        if !self.errors.is_empty() {
            let errors: Vec<String> = self
                .errors
                .iter()
                .map(|(kind, count)| format!("{kind}={count}"))
                .collect();
            write!(f, "; errors: {}", errors.join(", "))?;
        }

        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}
