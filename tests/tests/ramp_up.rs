mod utils;
#[allow(unused)]
use utils::*;

use stampede::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn ramp_up_tracks_interpolated_rate() {
    init();
    let (start_rate, end_rate, span) = (10., 30., 10.);
    let service = MockService::new(Duration::from_millis(1));

    let scenario = scenario("ramp", call(&service))
        .ramp_up(start_rate, end_rate, Duration::from_secs(10), 10_000)
        .max_concurrency(8);

    let mut outcomes = scenario.subscribe();
    let collector = tokio::spawn(async move {
        let mut timestamps = vec![];
        while let Ok(outcome) = outcomes.recv().await {
            timestamps.push(outcome.timestamp);
        }
        timestamps
    });

    let start = Instant::now();
    let summary = scenario.await.unwrap();
    let timestamps = collector.await.unwrap();

    assert_eq!(summary.total, 200);
    assert_eq!(timestamps.len(), 200);
    assert!(start.elapsed() < Duration::from_secs(10));

    let offsets: Vec<f64> = timestamps
        .iter()
        .map(|ts| (*ts - start).as_secs_f64())
        .collect();
    for window in 0..5 {
        let t = window as f64 * 2.;
        let measured = offsets.iter().filter(|o| **o >= t && **o < t + 2.).count() as f64;
        let mid = t + 1.;
        let expected = 2. * (start_rate + (end_rate - start_rate) * (mid / span));
        assert!(
            (measured - expected).abs() <= 2.,
            "window at {t}s: measured {measured}, expected {expected}"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn ramp_up_stops_at_total_count() {
    init();
    let service = MockService::new(Duration::from_millis(5));

    let start = Instant::now();
    let summary = scenario("ramp-capped", call(&service))
        .ramp_up(10., 100., Duration::from_secs(10), 100)
        .await
        .unwrap();

    assert_eq!(summary.total, 100);
    assert_eq!(service.calls(), 100);
    // N(t) = 10t + 4.5t^2 reaches 100 well before the ramp ends.
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn ramp_up_stops_at_duration() {
    init();
    let start = Instant::now();
    let summary = scenario("ramp-duration", || async { Ok::<_, String>(()) })
        .ramp_up(1., 5., Duration::from_secs(4), 1_000)
        .await
        .unwrap();

    // (1 + 5) / 2 * 4s
    assert_eq!(summary.total, 12);
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn ramp_down() {
    let summary = scenario("ramp-down", || async { Ok::<_, String>(()) })
        .ramp_up(40., 10., Duration::from_secs(2), 1_000)
        .await
        .unwrap();
    assert_eq!(summary.total, 50);
}

#[tokio::test(start_paused = true)]
async fn ramp_up_rejects_zero_count() {
    let err = scenario("ramp-zero", || async { Ok::<_, String>(()) })
        .ramp_up(1., 2., Duration::from_secs(1), 0)
        .await
        .unwrap_err();
    assert_eq!(err, ConfigError::InvalidCount(0));
}
