//! Request and response types for the acquisition pipeline.
//!
//! ## Organization
//!
//! - [`task`] — Task input, task-kind routing and the advisory retry policy
//! - [`option_chain`] — Typed option chain, legs, greeks and analytics responses
//! - [`nse`] — NSE option-chain payload and its conversion to [`OptionChain`]
//! - [`summary`] — OI aggregate buckets and the per-run summary
//!
//! The most used types are re-exported at the module root.

pub mod nse;
pub mod option_chain;
pub mod summary;
pub mod task;

pub use option_chain::{ChainEntry, Greeks, GreeksResponse, OptionChain, OptionLeg, Side};
pub use summary::{AggregateBucket, ChainSummary};
pub use task::{RetryPolicy, Task, TaskKind};
