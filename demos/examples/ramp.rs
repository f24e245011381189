use demos::simulated_request;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use stampede::prelude::*;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter("stampede=debug")
        .init();

    let operation = simulated_request
        .with_faults(
            FaultConfig::new(0.2).kinds([FailureKind::ServiceUnavailable]),
            SmallRng::seed_from_u64(11),
        )?
        .with_retry(
            RetryPolicy::new(NonZeroU32::new(4).unwrap())
                .base_delay(Duration::from_millis(50))
                .max_delay(Duration::from_millis(400)),
        )?;

    let summary = scenario("ramp", operation)
        .ramp_up(5., 100., Duration::from_secs(20), 1_000)
        .max_concurrency(50)
        .await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
