use std::time::Duration;

/// Worker pool size used when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Arrival queue capacity is this multiple of the worker pool size unless configured.
pub const DEFAULT_QUEUE_FACTOR: usize = 2;

/// Per-invocation deadline used when none is configured.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Latency an injected `Timeout` is pinned to unless configured.
pub const DEFAULT_TIMEOUT_CEILING: Duration = Duration::from_secs(5);

/// Latency multiplier applied by an injected `SlowResponse` unless configured.
pub const DEFAULT_SLOW_MULTIPLIER: f64 = 1.0;

/// Latency added by an injected `SlowResponse` unless configured.
pub const DEFAULT_SLOW_OFFSET: Duration = Duration::from_secs(2);

/// Buffer of the live outcome broadcast. Subscribers slower than this lag.
pub const DEFAULT_OUTCOME_BUFFER: usize = 1024;
