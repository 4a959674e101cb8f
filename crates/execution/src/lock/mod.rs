//! Distributed locking for saga mutual exclusion.
//!
//! Provides:
//! - The atomic check-and-set backend contract
//! - A lock client with per-acquisition ownership tokens, conditional
//!   release, and heartbeat lease renewal
//! - An in-process backend for single-process deployments and tests

mod client;
mod memory;

pub use client::*;
pub use memory::*;
