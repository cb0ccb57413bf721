//! Metrics collection and analysis

use keyed_batcher::{Key, EXPIRED_SENTINEL};
use tokio::time::{Duration, Instant};

/// Outcome of a single call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CallOutcome {
    /// A result was computed
    Computed(f64),
    /// The operation expired before it could be admitted
    Expired,
    /// The call failed with an error
    Failed,
}

impl CallOutcome {
    /// Classify a `calculate` result. Expired operations come back as the sentinel.
    pub fn from_result<E>(result: &Result<f64, E>) -> Self {
        match result {
            Ok(value) if *value == EXPIRED_SENTINEL => CallOutcome::Expired,
            Ok(value) => CallOutcome::Computed(*value),
            Err(_) => CallOutcome::Failed,
        }
    }
}

/// Metrics for a single call
#[derive(Debug, Clone)]
pub struct CallMetrics {
    pub worker: usize,
    pub key: Key,
    pub submitted_at: Instant,
    pub completed_at: Instant,
    pub outcome: CallOutcome,
}

impl CallMetrics {
    /// Total end-to-end latency from submission to outcome
    pub fn latency(&self) -> Duration {
        self.completed_at - self.submitted_at
    }
}

/// Collects metrics during simulation
#[derive(Debug, Default)]
pub struct MetricsCollector {
    calls: Vec<CallMetrics>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&mut self, metrics: CallMetrics) {
        self.calls.push(metrics);
    }

    /// Merge another collector's calls into this one.
    pub fn merge(&mut self, other: MetricsCollector) {
        self.calls.extend(other.calls);
    }

    pub fn calls(&self) -> &[CallMetrics] {
        &self.calls
    }

    pub fn computed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, CallOutcome::Computed(_)))
    }

    pub fn expired_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, CallOutcome::Expired))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|outcome| matches!(outcome, CallOutcome::Failed))
    }

    fn count(&self, f: impl Fn(&CallOutcome) -> bool) -> usize {
        self.calls.iter().filter(|call| f(&call.outcome)).count()
    }

    /// Calculate the total simulated duration from first submission to last outcome
    pub fn simulated_duration(&self) -> Option<Duration> {
        let first_submitted = self.calls.iter().map(|c| c.submitted_at).min()?;
        let last_outcome = self.calls.iter().map(|c| c.completed_at).max()?;

        Some(last_outcome - first_submitted)
    }

    /// Latency statistics for calls that computed a result.
    pub fn computed_latency(&self) -> LatencyStats {
        let mut latencies: Vec<Duration> = self
            .calls
            .iter()
            .filter(|call| matches!(call.outcome, CallOutcome::Computed(_)))
            .map(CallMetrics::latency)
            .collect();
        latencies.sort();

        LatencyStats {
            mean: duration_mean(&latencies),
            p50: duration_percentile(&latencies, 0.5),
            p99: duration_percentile(&latencies, 0.99),
            max: latencies.last().copied().unwrap_or(Duration::ZERO),
        }
    }
}

/// Latency statistics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub mean: Duration,
    pub p50: Duration,
    pub p99: Duration,
    pub max: Duration,
}

/// Calculate mean duration from a collection
fn duration_mean(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = durations.iter().copied().sum();
    total / durations.len() as u32
}

/// Calculate percentile from sorted duration data
fn duration_percentile(sorted_data: &[Duration], p: f64) -> Duration {
    if sorted_data.is_empty() {
        return Duration::ZERO;
    }
    if sorted_data.len() == 1 {
        return sorted_data[0];
    }

    let rank = p * (sorted_data.len() - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;
    let weight = rank - lower_idx as f64;

    let lower = sorted_data[lower_idx].as_secs_f64();
    let upper = sorted_data[upper_idx].as_secs_f64();
    Duration::from_secs_f64(lower * (1.0 - weight) + upper * weight)
}
