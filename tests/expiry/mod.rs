use std::{sync::Arc, time::Duration};

use assert_matches::assert_matches;
use futures::future::join_all;
use keyed_batcher::{BatchError, Calculator, Config, ExpiryReason, KeyEngine, EXPIRED_SENTINEL};
use tokio::time::Instant;

use crate::types::IdentityHasher;

/// Given an operation older than the admission deadline
/// When it is submitted
/// Then it is rejected straight away, without opening a window
#[tokio::test]
async fn stale_operations_are_rejected() {
    tokio::time::pause();

    let engine = KeyEngine::new(1, IdentityHasher, Config::default());

    let start = Instant::now();
    let result = engine
        .submit(start - Duration::from_millis(101), vec![1])
        .await;

    assert_matches!(result, Err(BatchError::Expired(ExpiryReason::Stale)));
    assert_elapsed!(start, Duration::ZERO, Duration::from_millis(1));

    assert_eq!(engine.window_count(), 0);
    assert_eq!(engine.last_result().await, 0.0);

    let stats = engine.stats();
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.expired_on_admission, 1);
    assert_eq!(stats.admitted(), 0);
    assert_eq!(stats.windows_opened, 0);
}

/// Given an operation exactly as old as the admission deadline
/// When it is submitted
/// Then it is admitted, and released when its window's lifetime has passed
#[tokio::test]
async fn operations_at_the_deadline_are_admitted() {
    tokio::time::pause();

    let engine = KeyEngine::new(1, IdentityHasher, Config::default());

    let start = Instant::now();
    let result = engine
        .submit(start - Duration::from_millis(100), vec![4])
        .await;

    assert_eq!(result.unwrap(), 4.0);
    // The window started at the operation's timestamp.
    assert_elapsed!(start, Duration::from_millis(100), Duration::from_millis(2));
    assert_eq!(engine.stats().expired_on_admission, 0);
}

/// Given a calculator
/// When an operation expires before admission
/// Then calculate returns the sentinel instead of an error
#[tokio::test]
async fn calculate_returns_sentinel_for_expired_operations() {
    tokio::time::pause();

    let calculator = Calculator::builder()
        .hasher(IdentityHasher)
        .max_key(10)
        .build();

    let result = calculator
        .calculate(3, Instant::now() - Duration::from_secs(1), vec![9])
        .await;

    assert_eq!(result.unwrap(), EXPIRED_SENTINEL);
    assert_eq!(calculator.engine(3).unwrap().window_count(), 0);
    assert_eq!(calculator.stats().expired_on_admission, 1);

    let result = calculator
        .submit(3, Instant::now() - Duration::from_secs(1), vec![9])
        .await;

    assert_matches!(result, Err(BatchError::Expired(ExpiryReason::Stale)));
}

/// Given a long stream of operations for one key
/// When each opens its own window
/// Then closed windows are pruned once there are more than the threshold
#[tokio::test]
async fn closed_windows_are_pruned() {
    tokio::time::pause();

    let engine = KeyEngine::new(1, IdentityHasher, Config::default());

    for i in 0..40 {
        engine.submit(Instant::now(), vec![i]).await.unwrap();
        assert!(engine.window_count() <= 31);
    }

    assert_eq!(engine.window_count(), 10);

    let stats = engine.stats();
    assert_eq!(stats.windows_opened, 40);
    assert_eq!(stats.windows_pruned, 30);
    assert_eq!(stats.batches_executed, 40);
}

/// Given operations expiring on several threads at once
/// When the counters are read while they are in flight
/// Then every snapshot is usable, and the final counts add up
#[tokio::test(flavor = "multi_thread", worker_threads = 3)]
async fn stats_can_be_read_during_submission() {
    let engine = Arc::new(KeyEngine::new(1, IdentityHasher, Config::default()));

    let submitters = (0..2).map(|_| {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            for _ in 0..20_000 {
                let result = engine
                    .submit(Instant::now() - Duration::from_secs(1), vec![1])
                    .await;
                assert_matches!(result, Err(BatchError::Expired(ExpiryReason::Stale)));
            }
        })
    });

    let reader = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move {
            for _ in 0..200_000 {
                let stats = engine.stats();
                assert!(stats.admitted() <= stats.submitted);
                assert_eq!(stats.coalescing_ratio(), 0.0);
            }
        }
    });

    for submitter in join_all(submitters).await {
        submitter.unwrap();
    }
    reader.await.unwrap();

    let stats = engine.stats();
    assert_eq!(stats.submitted, 40_000);
    assert_eq!(stats.expired_on_admission, 40_000);
    assert_eq!(stats.admitted(), 0);
}
