use demos::simulated_request;
use stampede::prelude::*;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), ConfigError> {
    FmtSubscriber::builder()
        .with_env_filter("stampede=debug")
        .init();

    let summary = scenario("burst", simulated_request)
        .burst(500)
        .max_concurrency(25)
        .await?;

    println!("{summary}");
    Ok(())
}
