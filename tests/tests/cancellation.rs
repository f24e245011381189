mod utils;
#[allow(unused)]
use utils::*;

use stampede::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn cancel_mid_run_yields_partial_summary() {
    init();
    let service = MockService::new(Duration::from_millis(20));
    let token = CancellationToken::new();

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let summary = scenario("cancelled", call(&service))
        .sustained(50., Duration::from_secs(60))
        .cancel_on(token)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert!(summary.total < 3_000);
    // The arrival due at exactly 2s races the cancel.
    assert!((100..=101).contains(&summary.total), "{}", summary.total);
    assert_eq!(summary.total, summary.success_count + summary.failure_count);
    assert!(start.elapsed() < Duration::from_millis(2100));
}

#[tokio::test(start_paused = true)]
async fn cancel_before_start() {
    let token = CancellationToken::new();
    token.cancel();

    let summary = scenario("pre-cancelled", || async { Ok::<_, String>(()) })
        .burst(1_000)
        .cancel_on(token)
        .await
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.total, 0);
    assert_eq!(summary.success_rate, 0.);
    assert_eq!(summary.latency, None);
}

#[tokio::test(start_paused = true)]
async fn cancel_lets_in_flight_finish() {
    init();
    let service = MockService::new(Duration::from_millis(300));

    let scenario = scenario("in-flight", call(&service))
        .burst(1_000)
        .max_concurrency(4);
    let token = scenario.cancellation_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(450)).await;
        token.cancel();
    });

    let start = Instant::now();
    let summary = scenario.await.unwrap();

    // Two waves of four; the second finishes after the cancel.
    assert_eq!(summary.total, 8);
    assert_eq!(summary.success_count, 8);
    assert_eq!(start.elapsed(), Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn in_flight_after_cancel_still_hits_deadline() {
    let summary = scenario("hung", || async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok::<_, String>(())
    })
    .burst(10)
    .max_concurrency(2)
    .deadline(Duration::from_secs(1))
    .cancel_on({
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        token
    })
    .await
    .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.error_count(ErrorKind::Timeout), 2);
    assert_eq!(summary.latency.unwrap().max, Duration::from_secs(1));
}

#[tokio::test]
#[ntest::timeout(5_000)]
async fn never_returning_operation_is_abandoned() {
    init();
    let summary = scenario("pending", || std::future::pending::<Result<(), String>>())
        .burst(3)
        .max_concurrency(3)
        .deadline(Duration::from_millis(50))
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.failure_count, 3);
    assert_eq!(summary.error_count(ErrorKind::Timeout), 3);
}
