use demos::simulated_request;
use stampede::prelude::*;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    FmtSubscriber::builder()
        .with_env_filter("stampede=info,chaos=info")
        .init();

    let faults = FaultConfig::new(0.15)
        .kinds([
            FailureKind::Timeout,
            FailureKind::ConnectionError,
            FailureKind::SlowResponse,
        ])
        .timeout_ceiling(Duration::from_secs(1))
        .slow_response(3., Duration::from_millis(250));

    let scenario = scenario("chaos", simulated_request)
        .steps([
            Stage::new(20., Duration::from_secs(5)),
            Stage::new(150., Duration::from_secs(3)),
            Stage::new(20., Duration::from_secs(5)),
        ])
        .max_concurrency(40)
        .deadline(Duration::from_secs(2))
        .faults(faults)
        .fault_seed(7);

    let token = scenario.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; finishing in-flight requests");
            token.cancel();
        }
    });

    let mut outcomes = scenario.subscribe();
    let progress = tokio::spawn(async move {
        let mut seen = 0u64;
        let mut failed = 0u64;
        while let Ok(outcome) = outcomes.recv().await {
            seen += 1;
            if !outcome.success {
                failed += 1;
            }
            if seen % 100 == 0 {
                info!("{seen} outcomes so far, {failed} failed");
            }
        }
    });

    let summary = scenario.await?;
    let _ = progress.await;

    println!("{summary}");
    for (kind, count) in &summary.errors {
        println!("  {kind}: {count}");
    }
    Ok(())
}
