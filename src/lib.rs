//! # nse-feed
//!
//! Market-data acquisition pipeline for NSE index, equity and option-chain
//! snapshots.
//!
//! A task names a data kind. The [`Pipeline`] routes it to a handler, which
//! fetches from the NSE site, rotates the payload into a cache store under
//! `<base>:{current,previous}:{data,timestamp}` and publishes a small change
//! notification. Option chains are also enriched with Greeks from an
//! analytics service and their open-interest deltas persisted to PostgreSQL.
//!
//! ## Quick Start
//!
//! ```no_run
//! use nse_feed::{Pipeline, Settings, Task};
//!
//! #[tokio::main]
//! async fn main() -> nse_feed::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let pipeline = Pipeline::from_settings(&settings).await?;
//!
//!     let task: Task = serde_json::from_str(r#"{"kind":"optionchain","symbol":"NIFTY","expiryCount":2}"#)?;
//!     println!("{}", pipeline.handle(&task).await?);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod client;
pub mod config;
pub mod constants;
pub mod enrich;
pub mod error;
pub mod expiry;
pub mod notify;
pub mod persist;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod types;

mod handlers;

/// Re-export the composition root at crate root for convenience.
pub use pipeline::{Pipeline, PipelineBuilder};
/// Re-export the settings type.
pub use config::Settings;
/// Re-export the error type and Result alias.
pub use error::{FeedError, Result};
/// Re-export the task input types.
pub use types::{RetryPolicy, Task, TaskKind};
