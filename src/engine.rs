use std::{
    fmt::{self, Debug},
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::{sync::Mutex as AsyncMutex, time::Instant};
use tracing::debug;

use crate::{
    config::Config,
    error::{BatchError, BatchResult, ExpiryReason},
    hasher::ValueHasher,
    operation::{Key, Operation},
    stats::{EngineStats, StatsRecorder},
    window::{Executor, KeyState, Window},
};

/// Batches operations for a single key.
///
/// Operations are grouped into windows. Each window is executed once, by the first caller to join
/// it, and every caller in the window gets back the running result after its own operation was
/// folded in. The final result of each batch seeds the next.
pub struct KeyEngine<H: ValueHasher> {
    key: Key,
    config: Config,
    hasher: H,

    state: Arc<AsyncMutex<KeyState>>,

    /// In creation order. Only closed windows are ever removed.
    windows: Mutex<Vec<Arc<Window<H>>>>,

    stats: Arc<StatsRecorder>,
}

impl<H: ValueHasher> KeyEngine<H> {
    /// Create an engine for `key` with no windows and a last result of zero.
    pub fn new(key: Key, hasher: H, config: Config) -> Self {
        Self {
            key,
            config,
            hasher,
            state: Arc::new(AsyncMutex::new(KeyState::default())),
            windows: Mutex::new(Vec::new()),
            stats: Arc::default(),
        }
    }

    /// The key this engine serves.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Submit an operation timestamped `ts`, and await its result.
    ///
    /// Returns [`BatchError::Expired`] without touching any window if `ts` is already older than
    /// the admission deadline.
    pub async fn submit(&self, ts: Instant, payload: Vec<H::Value>) -> BatchResult<f64, H::Error> {
        self.stats.record_submitted();

        let age = Instant::now().saturating_duration_since(ts);
        if age > self.config.admission_deadline {
            debug!(
                batch.key = self.key,
                age_ms = age.as_millis() as u64,
                "Skipped operation: expired before admission"
            );
            self.stats.record_expired_on_admission();
            return Err(BatchError::Expired(ExpiryReason::Stale));
        }

        let window = self.select_window(ts);
        self.join(window, ts, payload).await
    }

    /// Join a selected window and wait for its batch.
    async fn join(
        &self,
        window: Arc<Window<H>>,
        ts: Instant,
        payload: Vec<H::Value>,
    ) -> BatchResult<f64, H::Error> {
        let op = Operation {
            key: self.key,
            ts,
            payload,
        };
        let result = window.join_and_wait(op, self.executor()).await;

        if let Err(BatchError::Expired(ExpiryReason::WindowClosed)) = &result {
            self.stats.record_expired_on_join();
        }

        result
    }

    /// The final result of the most recently executed batch.
    pub async fn last_result(&self) -> f64 {
        self.state.lock().await.last_result
    }

    /// The number of windows currently held, open or closed.
    pub fn window_count(&self) -> usize {
        self.windows().len()
    }

    /// A snapshot of this engine's counters.
    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    fn windows(&self) -> MutexGuard<'_, Vec<Arc<Window<H>>>> {
        self.windows
            .lock()
            .expect("Windows mutex should not be poisoned")
    }

    /// Find the first open window that started at or before `ts`, or open a new one.
    fn select_window(&self, ts: Instant) -> Arc<Window<H>> {
        let mut windows = self.windows();

        let window = match windows.iter().find(|window| window.fits(ts)) {
            Some(window) => Arc::clone(window),
            None => {
                let window = Arc::new(Window::new(self.key, ts, self.config.window_lifetime()));
                windows.push(Arc::clone(&window));
                self.stats.record_window_opened();
                window
            }
        };

        if windows.len() > self.config.prune_threshold {
            let before = windows.len();
            windows.retain(|window| window.is_open());

            let pruned = before - windows.len();
            self.stats.record_windows_pruned(pruned);
            debug!(
                batch.key = self.key,
                pruned,
                remaining = windows.len(),
                "Pruned closed windows"
            );
        }

        window
    }

    fn executor(&self) -> Executor<H> {
        Executor {
            hasher: self.hasher.clone(),
            config: self.config,
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<H: ValueHasher> Debug for KeyEngine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let windows = self.windows();
        f.debug_struct("KeyEngine")
            .field("key", &self.key)
            .field("config", &self.config)
            .field("windows", &windows.len())
            .field(
                "oldest_window_start",
                &windows.first().map(|window| window.start()),
            )
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}
