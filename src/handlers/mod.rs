//! Acquisition handlers, one per [`TaskKind`](crate::types::TaskKind).
//!
//! Each handler is an `impl Pipeline` block. A handler runs
//! `fetch -> decode -> publish` once; a fetch or decode failure ends that
//! unit of work with an `"Error: ..."` result string, and a sink failure is
//! only logged.

mod indices;
mod ltp;
mod option_chain;
