#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Category of a recorded failure (or degradation) on an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ErrorKind {
    /// Injected timeout, or the per-invocation deadline expired.
    Timeout,
    ConnectionError,
    /// Success with inflated latency.
    SlowResponse,
    PartialFailure,
    ServiceUnavailable,
    /// The operation itself reported an error (or panicked).
    Invocation,
    /// The arrival was dropped because the queue was full. Never reached the operation.
    QueueOverflow,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConnectionError => "connection_error",
            ErrorKind::SlowResponse => "slow_response",
            ErrorKind::PartialFailure => "partial_failure",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Invocation => "invocation",
            ErrorKind::QueueOverflow => "queue_overflow",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeError {
    pub kind: ErrorKind,
    pub message: String,
}

/// The recorded result of exactly one invocation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub latency: Duration,
    pub error: Option<OutcomeError>,
    /// When the attempt started.
    pub timestamp: Instant,
}

impl Outcome {
    pub fn success(latency: Duration, timestamp: Instant) -> Self {
        Self {
            success: true,
            latency,
            error: None,
            timestamp,
        }
    }

    pub fn failure(
        kind: ErrorKind,
        message: impl Into<String>,
        latency: Duration,
        timestamp: Instant,
    ) -> Self {
        Self {
            success: false,
            latency,
            error: Some(OutcomeError {
                kind,
                message: message.into(),
            }),
            timestamp,
        }
    }

    /// An arrival that could not be queued.
    pub fn queue_overflow(timestamp: Instant) -> Self {
        Self::failure(
            ErrorKind::QueueOverflow,
            "arrival queue is full",
            Duration::ZERO,
            timestamp,
        )
    }

    /// Tag the outcome with an error kind without touching `success`.
    pub fn tagged(mut self, kind: ErrorKind, message: impl Into<String>) -> Self {
        self.error = Some(OutcomeError {
            kind,
            message: message.into(),
        });
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Whether the attempt reached the operation and therefore has a meaningful latency.
    pub fn was_invoked(&self) -> bool {
        self.kind() != Some(ErrorKind::QueueOverflow)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "ok in {:?}", self.latency),
            Some(err) if self.success => {
                write!(f, "ok ({}) in {:?}: {}", err.kind, self.latency, err.message)
            }
            Some(err) => write!(f, "{} in {:?}: {}", err.kind, self.latency, err.message),
        }
    }
}
