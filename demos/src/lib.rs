//! Shared helpers for the demo programs.
use anyhow::{anyhow, Result};
use rand::Rng;
use std::time::Duration;

/// Pretend request: sleeps 20-80ms and fails roughly one time in fifty.
pub async fn simulated_request() -> Result<()> {
    let (delay, fail) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(20..=80), rng.gen_bool(0.02))
    };
    tokio::time::sleep(Duration::from_millis(delay)).await;
    if fail {
        Err(anyhow!("Server error"))
    } else {
        Ok(())
    }
}
