//! Coalesce concurrent per-key operations into time-boxed windows, and fold each window once.
//!
//! Many tasks submit operations for a key at the same time, each wanting the same expensive,
//! order-sensitive state transition. Rather than each paying for it, operations are grouped into a
//! window. The first task to join a window becomes its leader: it waits for the window to close,
//! folds every operation in timestamp order on top of the key's last result, and hands each
//! waiting task the running result after its own operation.
//!
//! Operations that are already older than the admission deadline when submitted are rejected as
//! expired.
//!
//! See the README for an example.

#![deny(missing_docs)]

#[cfg(doctest)]
use doc_comment::doctest;
#[cfg(doctest)]
doctest!("../README.md");

mod calculator;
mod config;
mod engine;
pub mod error;
mod fold;
mod hasher;
mod operation;
mod stats;
mod window;

#[cfg(test)]
mod test_utils;

pub use calculator::{Calculator, DEFAULT_MAX_KEY, EXPIRED_SENTINEL};
pub use config::{Config, ExecutionPolicy, WorkDelay};
pub use engine::KeyEngine;
pub use error::{BatchError, BatchResult, ExpiryReason};
pub use fold::{fold_value, MODULUS};
pub use hasher::{StdHasher, ValueHasher};
pub use operation::Key;
pub use stats::EngineStats;
