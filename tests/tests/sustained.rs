mod utils;
#[allow(unused)]
use utils::*;

use stampede::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

#[tracing_test::traced_test]
#[tokio::test(start_paused = true)]
async fn sustained_20_rps_with_10_percent_faults() {
    let service = MockService::new(Duration::from_millis(20));

    let start = Instant::now();
    let summary = scenario("sustained-faults", call(&service))
        .sustained(20., Duration::from_secs(5))
        .faults(
            FaultConfig::new(0.1)
                .kinds([FailureKind::ConnectionError, FailureKind::ServiceUnavailable]),
        )
        .fault_seed(1234)
        .await
        .unwrap();

    assert_eq!(summary.total, 100);
    assert!(
        (2..=20).contains(&summary.failure_count),
        "{} failures",
        summary.failure_count
    );
    assert_eq!(
        summary.failure_count,
        summary.error_count(ErrorKind::ConnectionError)
            + summary.error_count(ErrorKind::ServiceUnavailable)
    );
    // Injected failures never reach the service.
    assert_eq!(service.calls(), summary.success_count);

    // Last arrival at 4.95s plus its latency.
    assert!(start.elapsed() >= Duration::from_millis(4950));
    assert!(start.elapsed() <= Duration::from_millis(5000));
    assert!(logs_contain("Pacing 20/s for 5s"));
}

#[tokio::test(start_paused = true)]
async fn same_seed_same_failures() {
    let mut counts = vec![];
    for _ in 0..2 {
        let summary = scenario("seeded", || async { Ok::<_, String>(()) })
            .sustained(50., Duration::from_secs(4))
            .faults(
                FaultConfig::new(0.3)
                    .kinds([FailureKind::ConnectionError, FailureKind::PartialFailure]),
            )
            .fault_seed(99)
            .await
            .unwrap();
        assert_eq!(summary.total, 200);
        counts.push(summary.errors);
    }
    assert_eq!(counts[0], counts[1]);
}

#[tokio::test(start_paused = true)]
async fn saturated_pool_overflows_queue() {
    let service = MockService::new(Duration::from_millis(200));

    let summary = scenario("overflow", call(&service))
        .sustained(100., Duration::from_secs(1))
        .max_concurrency(2)
        .queue_capacity(2)
        .await
        .unwrap();

    let overflowed = summary.error_count(ErrorKind::QueueOverflow);
    assert_eq!(summary.total, 100);
    assert!(overflowed > 50, "{overflowed} overflowed");
    assert_eq!(summary.success_count + overflowed, 100);
    assert_eq!(service.calls(), summary.success_count);
    assert!(service.peak() <= 2);

    // Only invoked outcomes carry latency.
    let latency = summary.latency.unwrap();
    assert_eq!(latency.min, Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn step_load_spike() {
    let service = MockService::new(Duration::from_millis(50));

    let summary = scenario("spike", call(&service))
        .steps([
            Stage::new(10., Duration::from_secs(2)),
            Stage::new(200., Duration::from_secs(1)),
            Stage::new(10., Duration::from_secs(2)),
        ])
        .max_concurrency(5)
        .queue_capacity(10)
        .await
        .unwrap();

    assert_eq!(summary.total, 240);
    // The calm stages never overflow; the spike exceeds 5 workers at 50ms each.
    let overflowed = summary.error_count(ErrorKind::QueueOverflow);
    assert!(overflowed > 0);
    assert!(overflowed < 200);
    assert_eq!(summary.success_count + overflowed, 240);
}

#[tokio::test(start_paused = true)]
async fn config_driven_run() {
    let mut config = ScenarioConfig::new("config");
    config.pattern = Some(LoadPattern::sustained(10., Duration::from_secs(3)));
    config.max_concurrency = 3;

    let summary = stampede::run(
        || async { Ok::<_, String>(()) },
        config,
        CancellationToken::new(),
    )
    .await
    .unwrap();
    assert_eq!(summary.total, 30);
    assert_eq!(summary.success_rate, 1.);
}

#[tokio::test(start_paused = true)]
async fn invalid_patterns_fail_fast() {
    let op = || async { Ok::<_, String>(()) };

    let err = scenario("zero-duration", op)
        .sustained(10., Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::ZeroDuration);

    let err = scenario("negative-rate", op)
        .sustained(-1., Duration::from_secs(1))
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::InvalidRate(-1.));

    let err = scenario("empty-steps", op)
        .steps(Vec::<Stage>::new())
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::EmptySteps);

    let err = scenario("bad-faults", op)
        .burst(1)
        .faults(FaultConfig::new(1.01))
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::FailureRateOutOfRange(1.01));

    let err = scenario("zero-deadline", op)
        .burst(1)
        .deadline(Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::ZeroDeadline);
}
