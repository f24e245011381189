use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use stampede::Operation;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[allow(unused)]
pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("stampede=debug,utils=debug")
            .try_init();
    });
}

/// In-memory stand-in for a service under test.
///
/// Sleeps for `latency` (plus up to `jitter`) and fails with probability `error_rate`.
#[allow(unused)]
pub struct MockService {
    latency: Duration,
    jitter: Duration,
    error_rate: f64,
    rng: Mutex<SmallRng>,
    pub calls: AtomicU64,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

#[allow(unused)]
impl MockService {
    pub fn new(latency: Duration) -> Arc<Self> {
        Self::build(latency, Duration::ZERO, 0.)
    }

    pub fn build(latency: Duration, jitter: Duration, error_rate: f64) -> Arc<Self> {
        Arc::new(Self {
            latency,
            jitter,
            error_rate,
            rng: Mutex::new(SmallRng::seed_from_u64(0xdead_beef)),
            calls: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        })
    }

    pub async fn handle(&self) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let (delay, fail) = {
            let mut rng = self.rng.lock().unwrap();
            let extra = if self.jitter.is_zero() {
                Duration::ZERO
            } else {
                rng.gen_range(Duration::ZERO..=self.jitter)
            };
            (self.latency + extra, rng.gen::<f64>() < self.error_rate)
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail {
            debug!("Mock service failing request");
            anyhow::bail!("mock service returned 500");
        }
        Ok(())
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// Operation calling `service`.
#[allow(unused)]
pub fn call(service: &Arc<MockService>) -> impl Operation {
    let service = service.clone();
    move || {
        let service = service.clone();
        async move { service.handle().await }
    }
}

/// Absolute difference between two durations.
#[allow(unused)]
pub fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
