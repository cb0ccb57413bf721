//! Simulation framework for driving a keyed-batcher calculator under concurrent load.

pub mod arrival;
pub mod keys;
pub mod metrics;
pub mod payload;
pub mod scenario;
