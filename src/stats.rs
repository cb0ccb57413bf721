use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one key engine.
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    submitted: AtomicU64,
    expired_on_admission: AtomicU64,
    expired_on_join: AtomicU64,
    windows_opened: AtomicU64,
    windows_pruned: AtomicU64,
    batches_executed: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired_on_admission(&self) {
        self.expired_on_admission.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expired_on_join(&self) {
        self.expired_on_join.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_window_opened(&self) {
        self.windows_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_windows_pruned(&self, count: usize) {
        self.windows_pruned.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_executed(&self) {
        self.batches_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters are loaded one at a time, so a snapshot taken while operations are in flight may
    /// not add up exactly. Expiries are loaded before submissions to keep them from outrunning it.
    pub(crate) fn snapshot(&self) -> EngineStats {
        let expired_on_admission = self.expired_on_admission.load(Ordering::Relaxed);
        let expired_on_join = self.expired_on_join.load(Ordering::Relaxed);
        let batches_executed = self.batches_executed.load(Ordering::Relaxed);

        EngineStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            expired_on_admission,
            expired_on_join,
            windows_opened: self.windows_opened.load(Ordering::Relaxed),
            windows_pruned: self.windows_pruned.load(Ordering::Relaxed),
            batches_executed,
        }
    }
}

/// A point-in-time snapshot of a key engine's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Operations submitted, including those that expired.
    pub submitted: u64,
    /// Operations rejected because they were already too old when submitted.
    pub expired_on_admission: u64,
    /// Operations rejected because their window closed before they could join it.
    pub expired_on_join: u64,
    /// Windows created.
    pub windows_opened: u64,
    /// Closed windows removed from the window list.
    pub windows_pruned: u64,
    /// Batches executed. At most one per window.
    pub batches_executed: u64,
}

impl EngineStats {
    /// Operations that made it into a window.
    ///
    /// Never underflows, even for a snapshot taken mid-submission.
    pub fn admitted(&self) -> u64 {
        self.submitted
            .saturating_sub(self.expired_on_admission)
            .saturating_sub(self.expired_on_join)
    }

    /// The fraction of admitted operations that shared a batch with an earlier operation.
    pub fn coalescing_ratio(&self) -> f64 {
        let admitted = self.admitted();
        if admitted == 0 {
            0.0
        } else {
            admitted.saturating_sub(self.batches_executed) as f64 / admitted as f64
        }
    }

    /// Add another engine's counters to these.
    pub fn combine(self, other: EngineStats) -> EngineStats {
        EngineStats {
            submitted: self.submitted + other.submitted,
            expired_on_admission: self.expired_on_admission + other.expired_on_admission,
            expired_on_join: self.expired_on_join + other.expired_on_join,
            windows_opened: self.windows_opened + other.windows_opened,
            windows_pruned: self.windows_pruned + other.windows_pruned,
            batches_executed: self.batches_executed + other.batches_executed,
        }
    }
}
