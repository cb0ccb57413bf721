use std::cmp::Ordering;

use tokio::time::Instant;

/// Identifies the engine (and its state) an operation belongs to.
pub type Key = u16;

/// A single submitted request.
#[derive(Debug)]
pub(crate) struct Operation<V> {
    pub key: Key,
    /// When the caller's data was timestamped. Orders operations within a window.
    pub ts: Instant,
    /// Folded in the order given.
    pub payload: Vec<V>,
}

/// Where an admitted operation sits in its window's fold order.
///
/// Ordered by timestamp, then by arrival into the window, so operations sharing a timestamp are
/// folded in the order they joined and each still gets its own result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct OperationId {
    ts: Instant,
    seq: u64,
}

impl OperationId {
    pub(crate) fn new(ts: Instant, seq: u64) -> Self {
        Self { ts, seq }
    }
}

/// An operation waiting in a window's pending heap.
#[derive(Debug)]
pub(crate) struct Queued<V> {
    pub id: OperationId,
    pub op: Operation<V>,
}

impl<V> PartialEq for Queued<V> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<V> Eq for Queued<V> {}

impl<V> PartialOrd for Queued<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for Queued<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
