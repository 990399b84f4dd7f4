//! Run one acquisition task and print its result.
//!
//! The task is a JSON object, given as the first argument or on stdin.
//! Sinks are configured from the environment (see [`nse_feed::Settings`]).
//!
//! # Usage
//!
//! ```sh
//! export REDIS_URL="redis://localhost:6379/0"
//! cargo run --bin nse-feed --features cli -- '{"kind":"allindices","timeoutMs":5000}'
//! echo '{"kind":"optionchain","symbol":"NIFTY","expiryCount":2}' | cargo run --bin nse-feed --features cli
//! ```

use std::env;
use std::process::ExitCode;

use nse_feed::{FeedError, Pipeline, Settings, Task};
use tokio::io::AsyncReadExt;

async fn read_task() -> nse_feed::Result<Task> {
    let raw = match env::args().nth(1).filter(|a| a != "-") {
        Some(arg) => arg,
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .map_err(|e| FeedError::InvalidTask(format!("failed to read stdin: {e}")))?;
            buf
        }
    };
    Ok(serde_json::from_str(raw.trim())?)
}

async fn run() -> nse_feed::Result<String> {
    let task = read_task().await?;
    let settings = Settings::from_env()?;
    let pipeline = Pipeline::from_settings(&settings).await?;

    let policy = task.retry_policy();
    tracing::info!(
        attempts = policy.max_attempts(),
        timeout_ms = policy.timeout.as_millis() as u64,
        delay_ms = policy.delay.as_millis() as u64,
        "running task"
    );
    let (pipeline, task) = (&pipeline, &task);
    policy.retry_async(move |_| pipeline.handle(task)).await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, retryable = err.is_retryable(), "task failed");
            println!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
