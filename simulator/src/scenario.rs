//! Scenario runner for orchestrating simulations

use std::sync::Arc;

use bon::bon;
use keyed_batcher::{Calculator, Config, EngineStats, StdHasher};
use thiserror::Error;
use tokio::{
    task::JoinSet,
    time::{Duration, Instant},
};
use tracing::{info, instrument::WithSubscriber, warn};

use crate::{
    arrival::ThinkTime,
    keys::{KeyDistribution, KeyGenerator},
    metrics::{CallMetrics, CallOutcome, MetricsCollector},
    payload::PayloadGenerator,
};

/// Configuration for a simulation scenario
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Delay between starting one worker and the next
    pub worker_stagger: Duration,

    /// How long each worker keeps making calls
    pub duration: Duration,

    /// Key distribution across calls
    pub keys: KeyDistribution,

    /// Number of values in each payload
    pub payload_len: usize,

    /// Shortest and longest pause between a worker's calls
    pub think_time: (Duration, Duration),

    /// Seed for reproducibility (used for keys, payloads and think times)
    pub seed: Option<u64>,

    /// Batching engine configuration
    pub engine: Config,
}

#[bon]
impl ScenarioConfig {
    #[builder]
    pub fn new(
        #[builder(default = 10)] workers: usize,
        #[builder(default = Duration::from_millis(20))] worker_stagger: Duration,
        duration: Duration,
        #[builder(default = KeyDistribution::Uniform(1..=1000))] keys: KeyDistribution,
        #[builder(default = 10)] payload_len: usize,
        #[builder(default = (Duration::from_millis(5), Duration::from_millis(20)))]
        think_time: (Duration, Duration),
        seed: Option<u64>,
        #[builder(default)] engine: Config,
    ) -> Self {
        Self {
            workers,
            worker_stagger,
            duration,
            keys,
            payload_len,
            think_time,
            seed,
            engine,
        }
    }
}

/// Error types for scenario execution
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// What a scenario run produced
#[derive(Debug)]
pub struct RunReport {
    pub metrics: MetricsCollector,
    pub engine: EngineStats,
}

/// Orchestrates a simulation scenario
pub struct ScenarioRunner {
    config: ScenarioConfig,
}

impl ScenarioRunner {
    /// Create a new scenario runner
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Run the scenario and return collected metrics
    pub async fn run(self) -> Result<RunReport, ScenarioError> {
        let config = self.config;

        let calculator = Arc::new(
            Calculator::builder()
                .hasher(StdHasher::<u64>::new())
                .config(config.engine)
                .max_key(config.keys.max_key())
                .build(),
        );

        info!(
            workers = config.workers,
            duration_ms = config.duration.as_millis() as u64,
            engine = %config.engine,
            "Starting scenario"
        );

        let mut workers = JoinSet::new();
        for worker in 0..config.workers {
            if worker > 0 {
                tokio::time::sleep(config.worker_stagger).await;
            }

            // Each worker gets its own seed, derived from the scenario's
            let seed = config
                .seed
                .map(|seed| seed.wrapping_add(worker as u64));

            workers.spawn(
                run_worker(worker, Arc::clone(&calculator), config.clone(), seed)
                    .with_current_subscriber(),
            );
        }

        let mut metrics = MetricsCollector::new();
        while let Some(worker_metrics) = workers.join_next().await {
            metrics.merge(worker_metrics?);
        }

        Ok(RunReport {
            metrics,
            engine: calculator.stats(),
        })
    }
}

async fn run_worker(
    worker: usize,
    calculator: Arc<Calculator<StdHasher<u64>>>,
    config: ScenarioConfig,
    seed: Option<u64>,
) -> MetricsCollector {
    let mut keys = KeyGenerator::new(config.keys, stream_seed(seed, Stream::Keys));
    let mut payloads =
        PayloadGenerator::new(config.payload_len, stream_seed(seed, Stream::Payloads));
    let mut think_time = ThinkTime::new(config.think_time, stream_seed(seed, Stream::ThinkTime));

    let mut metrics = MetricsCollector::new();
    let stop_at = Instant::now() + config.duration;

    while Instant::now() < stop_at {
        let key = keys.next_key();
        let submitted_at = Instant::now();

        let result = calculator
            .calculate(key, submitted_at, payloads.next_payload())
            .await;

        let outcome = CallOutcome::from_result(&result);
        match &result {
            Ok(value) => info!(worker, key, value, "Calculated"),
            Err(err) => warn!(worker, key, error = %err, "Calculation failed"),
        }

        metrics.record_call(CallMetrics {
            worker,
            key,
            submitted_at,
            completed_at: Instant::now(),
            outcome,
        });

        tokio::time::sleep(think_time.next_pause()).await;
    }

    metrics
}

/// A worker's random streams. Each gets its own seed, so keys, payloads and pauses aren't
/// correlated.
#[derive(Debug, Clone, Copy)]
enum Stream {
    Keys = 0,
    Payloads = 1,
    ThinkTime = 2,
}

/// Distinct for every (worker seed, stream) pair while worker seeds are consecutive.
fn stream_seed(worker_seed: Option<u64>, stream: Stream) -> Option<u64> {
    worker_seed.map(|seed| seed.wrapping_mul(3).wrapping_add(stream as u64))
}
