use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    fmt::{self, Debug},
    mem,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    sync::{watch, Mutex as AsyncMutex},
    time::Instant,
};
use tracing::{debug, info, instrument::WithSubscriber, span, warn, Instrument, Level};

use crate::{
    config::{Config, ExecutionPolicy},
    error::{join_error_to_batch_error, BatchError, BatchResult, ExpiryReason},
    fold::{fold_batch, Folded},
    hasher::ValueHasher,
    operation::{Key, Operation, OperationId, Queued},
    stats::StatsRecorder,
};

/// The state carried from one batch to the next for a key.
#[derive(Debug, Default)]
pub(crate) struct KeyState {
    pub last_result: f64,
}

/// Where a window closes if its lifetime can't be represented. Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

type Pending<V> = BinaryHeap<Reverse<Queued<V>>>;

/// A window's published results: the running value after each of its operations.
type Outcome<E> = Result<Arc<HashMap<OperationId, f64>>, BatchError<E>>;

/// A time-boxed batch of operations for one key.
///
/// The first operation to join becomes the leader. It closes the window once its lifetime has
/// passed, folds every pending operation and publishes the results to everyone who joined.
pub(crate) struct Window<H: ValueHasher> {
    key: Key,
    start: Instant,
    closes_at: Instant,

    admission: Mutex<Admission<H::Value>>,

    /// Holds `None` until the batch has executed.
    results: watch::Sender<Option<Outcome<H::Error>>>,
}

struct Admission<V> {
    /// Goes from `true` to `false` exactly once.
    open: bool,
    leader_claimed: bool,
    next_seq: u64,
    pending: Pending<V>,
}

#[derive(Debug)]
enum Role {
    Leader,
    Follower,
}

/// What the leader needs in order to execute a batch.
pub(crate) struct Executor<H: ValueHasher> {
    pub hasher: H,
    pub config: Config,
    pub state: Arc<AsyncMutex<KeyState>>,
    pub stats: Arc<StatsRecorder>,
}

impl<H: ValueHasher> Window<H> {
    pub(crate) fn new(key: Key, start: Instant, lifetime: Duration) -> Self {
        let (results, _) = watch::channel(None);

        Self {
            key,
            start,
            closes_at: start
                .checked_add(lifetime)
                .unwrap_or_else(|| start + FAR_FUTURE),
            admission: Mutex::new(Admission {
                open: true,
                leader_claimed: false,
                next_seq: 0,
                pending: BinaryHeap::new(),
            }),
            results,
        }
    }

    fn admission(&self) -> MutexGuard<'_, Admission<H::Value>> {
        self.admission
            .lock()
            .expect("Admission mutex should not be poisoned")
    }

    pub(crate) fn start(&self) -> Instant {
        self.start
    }

    pub(crate) fn is_open(&self) -> bool {
        self.admission().open
    }

    /// Can an operation with this timestamp join?
    pub(crate) fn fits(&self, ts: Instant) -> bool {
        self.start <= ts && self.is_open()
    }

    /// Join the window and wait for the batch to execute.
    ///
    /// Admission happens before the first await, so a window handed out by the engine is always
    /// joined by the caller it was handed to, unless it has already closed.
    pub(crate) async fn join_and_wait(
        self: Arc<Self>,
        op: Operation<H::Value>,
        executor: Executor<H>,
    ) -> BatchResult<f64, H::Error> {
        let (id, role) = self.admit(op)?;

        let mut results = self.results.subscribe();

        if let Role::Leader = role {
            Arc::clone(&self).lead(executor);
        }

        let outcome = {
            let published = results
                .wait_for(Option::is_some)
                .await
                .map_err(|_| BatchError::Cancelled)?;
            published.clone()
        };

        match outcome {
            Some(Ok(results)) => results.get(&id).copied().ok_or(BatchError::Cancelled),
            Some(Err(err)) => Err(err),
            None => Err(BatchError::Cancelled),
        }
    }

    fn admit(&self, op: Operation<H::Value>) -> BatchResult<(OperationId, Role), H::Error> {
        let mut admission = self.admission();

        if !admission.open {
            debug!(
                batch.key = op.key,
                "Skipped operation: window closed before it could join"
            );
            return Err(BatchError::Expired(ExpiryReason::WindowClosed));
        }

        let id = OperationId::new(op.ts, admission.next_seq);
        admission.next_seq += 1;

        let role = if mem::replace(&mut admission.leader_claimed, true) {
            Role::Follower
        } else {
            Role::Leader
        };

        admission.pending.push(Reverse(Queued { id, op }));

        Ok((id, role))
    }

    /// Close the window, taking everything that joined it.
    pub(crate) fn close(&self) -> Pending<H::Value> {
        let mut admission = self.admission();
        admission.open = false;
        mem::take(&mut admission.pending)
    }

    /// Wait out the window's lifetime, then execute its batch and publish the results.
    ///
    /// Runs on its own task, so the batch still executes if the leader's caller stops waiting.
    fn lead(self: Arc<Self>, executor: Executor<H>) {
        tokio::spawn(
            async move {
                tokio::time::sleep_until(self.closes_at).await;

                let pending = self.close();

                // Convert to u64 so tracing will treat this as an integer instead of a string.
                let span = span!(
                    Level::INFO,
                    "process window",
                    batch.key = self.key,
                    batch.size = pending.len() as u64
                );

                // Spawn a task so we can catch panics.
                let outcome = tokio::spawn(
                    execute(pending, executor)
                        .instrument(span)
                        .with_current_subscriber(),
                )
                .await
                .map_err(join_error_to_batch_error)
                .and_then(|r| r);

                self.results.send_replace(Some(outcome));
            }
            .with_current_subscriber(),
        );
    }
}

async fn execute<H: ValueHasher>(
    pending: Pending<H::Value>,
    executor: Executor<H>,
) -> Outcome<H::Error> {
    let Executor {
        hasher,
        config,
        state,
        stats,
    } = executor;

    stats.record_batch_executed();

    let folded: Result<Folded, H::Error> = match config.execution {
        ExecutionPolicy::Serialized => {
            let mut state = state.lock().await;
            info!(seed = state.last_result, "Batch started");

            let folded = fold_batch(&hasher, config.work_delay, state.last_result, pending).await;
            if let Ok((last_result, _)) = &folded {
                state.last_result = *last_result;
            }
            folded
        }
        ExecutionPolicy::Overlapping => {
            let seed = state.lock().await.last_result;
            info!(seed, "Batch started");

            let folded = fold_batch(&hasher, config.work_delay, seed, pending).await;
            if let Ok((last_result, _)) = &folded {
                state.lock().await.last_result = *last_result;
            }
            folded
        }
    };

    match folded {
        Ok((last_result, results)) => {
            info!(last_result, "Batch finished");
            Ok(Arc::new(results))
        }
        Err(err) => {
            warn!(error = %err, "Batch failed, key state left unchanged");
            Err(BatchError::FoldFailed(err))
        }
    }
}

impl<H: ValueHasher> Debug for Window<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let admission = self.admission();
        f.debug_struct("Window")
            .field("key", &self.key)
            .field("start", &self.start)
            .field("closes_at", &self.closes_at)
            .field("open", &admission.open)
            .field("pending", &admission.pending.len())
            .finish()
    }
}
