use std::{
    fmt::{self, Display},
    time::Duration,
};

use bon::bon;
use rand::Rng;

const DEFAULT_ADMISSION_DEADLINE: Duration = Duration::from_millis(100);
const DEFAULT_PRUNE_THRESHOLD: usize = 30;

/// Configuration shared by every key engine.
///
/// A window stays open for twice the admission deadline after its start, so that an operation
/// which was already nearly a full deadline old when submitted can still join a window opened
/// before it arrived.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub struct Config {
    pub(crate) admission_deadline: Duration,
    pub(crate) prune_threshold: usize,
    pub(crate) execution: ExecutionPolicy,
    pub(crate) work_delay: WorkDelay,
}

#[bon]
impl Config {
    #[allow(missing_docs)]
    #[builder]
    pub fn new(
        /// Operations whose timestamp is older than this when submitted are rejected as expired.
        #[builder(default = DEFAULT_ADMISSION_DEADLINE)]
        admission_deadline: Duration,
        /// Closed windows are pruned once a key holds more than this many windows.
        #[builder(default = DEFAULT_PRUNE_THRESHOLD)]
        prune_threshold: usize,
        /// Whether batches for the same key may execute at the same time.
        #[builder(default)]
        execution: ExecutionPolicy,
        /// Simulated processing cost paid after folding each operation.
        #[builder(default)]
        work_delay: WorkDelay,
    ) -> Self {
        Self {
            admission_deadline,
            prune_threshold,
            execution,
            work_delay,
        }
    }

    /// The maximum tolerated age of an operation when it is submitted.
    pub fn admission_deadline(&self) -> Duration {
        self.admission_deadline
    }

    /// How long a window stays open after its start.
    pub fn window_lifetime(&self) -> Duration {
        self.admission_deadline.saturating_mul(2)
    }

    /// Closed windows are pruned once a key holds more than this many windows.
    pub fn prune_threshold(&self) -> usize {
        self.prune_threshold
    }

    /// Whether batches for the same key may execute at the same time.
    pub fn execution(&self) -> ExecutionPolicy {
        self.execution
    }

    /// Simulated processing cost paid after folding each operation.
    pub fn work_delay(&self) -> WorkDelay {
        self.work_delay
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            admission_deadline: DEFAULT_ADMISSION_DEADLINE,
            prune_threshold: DEFAULT_PRUNE_THRESHOLD,
            execution: ExecutionPolicy::default(),
            work_delay: WorkDelay::default(),
        }
    }
}

impl Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "admission_deadline: {}ms, prune_threshold: {}, execution: {}, work_delay: {}",
            self.admission_deadline.as_millis(),
            self.prune_threshold,
            self.execution,
            self.work_delay
        )
    }
}

/// Controls whether batches for the same key may execute concurrently.
///
/// Windows for one key can close at overlapping times, e.g. when a late-timestamped operation
/// opens a window that closes before an earlier-opened one finishes executing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExecutionPolicy {
    /// Run one batch at a time per key.
    ///
    /// Each batch starts from the final result of the batch that ran before it.
    #[default]
    Serialized,

    /// Let batches for a key overlap.
    ///
    /// Each batch reads the key's state when it starts and writes it when it finishes, so when two
    /// batches overlap the one finishing last overwrites the other's result.
    Overlapping,
}

impl Display for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutionPolicy::Serialized => "Serialized",
            ExecutionPolicy::Overlapping => "Overlapping",
        })
    }
}

/// Simulated processing cost, paid by the executing task after folding each operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkDelay {
    /// No delay.
    #[default]
    Disabled,
    /// Always wait this long.
    Fixed(Duration),
    /// Wait a uniformly random number of whole milliseconds, up to and including this duration.
    UpTo(Duration),
}

impl WorkDelay {
    pub(crate) fn sample(&self) -> Duration {
        match *self {
            WorkDelay::Disabled => Duration::ZERO,
            WorkDelay::Fixed(delay) => delay,
            WorkDelay::UpTo(max) => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                let millis = rand::rng().random_range(0..=max_ms);
                Duration::from_millis(millis)
            }
        }
    }

    pub(crate) async fn simulate(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Display for WorkDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkDelay::Disabled => write!(f, "Disabled"),
            WorkDelay::Fixed(delay) => write!(f, "Fixed({}ms)", delay.as_millis()),
            WorkDelay::UpTo(max) => write!(f, "UpTo({}ms)", max.as_millis()),
        }
    }
}
