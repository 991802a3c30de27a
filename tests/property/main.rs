//! Property tests for ordering guarantees under randomized task latency.
//!
//! Run with: `cargo test --test property`

#[path = "../common/mod.rs"]
mod common;

mod ordering;
