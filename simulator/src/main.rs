use keyed_batcher::{Config, WorkDelay};
use simulator::scenario::{ScenarioConfig, ScenarioError, ScenarioRunner};
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ScenarioError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ScenarioConfig::builder()
        .duration(Duration::from_secs(10))
        .engine(
            Config::builder()
                .work_delay(WorkDelay::UpTo(Duration::from_millis(100)))
                .build(),
        )
        .build();

    let report = ScenarioRunner::new(config).run().await?;

    let latency = report.metrics.computed_latency();
    info!(
        calls = report.metrics.calls().len() as u64,
        computed = report.metrics.computed_count() as u64,
        expired = report.metrics.expired_count() as u64,
        failed = report.metrics.failed_count() as u64,
        "Simulation finished"
    );
    info!(
        mean_ms = latency.mean.as_millis() as u64,
        p50_ms = latency.p50.as_millis() as u64,
        p99_ms = latency.p99.as_millis() as u64,
        max_ms = latency.max.as_millis() as u64,
        "Latency of computed results"
    );
    info!(
        windows_opened = report.engine.windows_opened,
        windows_pruned = report.engine.windows_pruned,
        batches_executed = report.engine.batches_executed,
        coalescing_ratio = report.engine.coalescing_ratio(),
        "Engine counters"
    );

    Ok(())
}
