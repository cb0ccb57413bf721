use std::fmt::{self, Debug};

use bon::bon;
use tokio::time::Instant;
use tracing::info;

use crate::{
    config::Config,
    engine::KeyEngine,
    error::{BatchError, BatchResult},
    hasher::ValueHasher,
    operation::Key,
    stats::EngineStats,
};

/// The result [`Calculator::calculate`] returns for operations that expired before admission.
pub const EXPIRED_SENTINEL: f64 = 0.0;

/// The largest key served by default.
pub const DEFAULT_MAX_KEY: Key = 1000;

/// Routes operations to the engine for their key.
///
/// Holds one [`KeyEngine`] for every key from zero up to and including `max_key`, created up front.
/// Share it between tasks with an `Arc`.
pub struct Calculator<H: ValueHasher> {
    max_key: Key,
    engines: Box<[KeyEngine<H>]>,
}

#[bon]
impl<H: ValueHasher> Calculator<H> {
    /// Create a calculator.
    #[builder]
    pub fn new(
        hasher: H,
        #[builder(default)] config: Config,
        /// The largest key served. Defaults to [`DEFAULT_MAX_KEY`].
        #[builder(default = DEFAULT_MAX_KEY)]
        max_key: Key,
    ) -> Self {
        let engines = (0..=max_key)
            .map(|key| KeyEngine::new(key, hasher.clone(), config))
            .collect();

        info!(max_key, %config, "Calculator ready");

        Self { max_key, engines }
    }

    /// The largest key served.
    pub fn max_key(&self) -> Key {
        self.max_key
    }

    /// Get the engine for a key.
    pub fn engine(&self, key: Key) -> BatchResult<&KeyEngine<H>, H::Error> {
        self.engines
            .get(usize::from(key))
            .ok_or(BatchError::KeyOutOfRange {
                key,
                max_key: self.max_key,
            })
    }

    /// Submit an operation for a key and await its result.
    pub async fn submit(
        &self,
        key: Key,
        ts: Instant,
        payload: Vec<H::Value>,
    ) -> BatchResult<f64, H::Error> {
        self.engine(key)?.submit(ts, payload).await
    }

    /// Submit an operation for a key and await its result, treating expiry as an ordinary outcome.
    ///
    /// Operations that expire before they can be admitted return [`EXPIRED_SENTINEL`] instead of
    /// an error. Anything else that goes wrong is still an error.
    pub async fn calculate(
        &self,
        key: Key,
        ts: Instant,
        payload: Vec<H::Value>,
    ) -> BatchResult<f64, H::Error> {
        match self.submit(key, ts, payload).await {
            Err(BatchError::Expired(_)) => Ok(EXPIRED_SENTINEL),
            other => other,
        }
    }

    /// The counters of every engine added together.
    pub fn stats(&self) -> EngineStats {
        self.engines
            .iter()
            .map(KeyEngine::stats)
            .fold(EngineStats::default(), EngineStats::combine)
    }
}

impl<H: ValueHasher> Debug for Calculator<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calculator")
            .field("max_key", &self.max_key)
            .field("stats", &self.stats())
            .finish()
    }
}
