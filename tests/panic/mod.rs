use std::time::Duration;

use assert_matches::assert_matches;
use futures::future::join_all;
use keyed_batcher::{BatchError, Config, KeyEngine, ValueHasher};
use tokio::time::Instant;

/// Panics when asked to hash a particular value.
#[derive(Debug, Clone, Copy)]
pub struct PanickingHasher {
    panic_on: i32,
}

impl ValueHasher for PanickingHasher {
    type Value = i32;
    type Error = String;

    fn hash_value(&self, value: &i32) -> Result<i32, String> {
        if *value == self.panic_on {
            panic!("Hashing panic for value: {value}");
        }
        Ok(*value)
    }
}

/// Given a hasher that panics during a batch
/// When we submit operations into that batch
/// Then all of them should fail with a Panic error
#[tokio::test]
async fn fold_panic_handling() {
    tokio::time::pause();

    let engine = KeyEngine::new(1, PanickingHasher { panic_on: 13 }, Config::default());

    let now = Instant::now();
    let results = join_all([
        engine.submit(now, vec![1]),
        engine.submit(now + Duration::from_millis(1), vec![13]),
        engine.submit(now + Duration::from_millis(2), vec![2]),
    ])
    .await;

    for result in results {
        assert_matches!(result, Err(BatchError::Panic));
    }
}

/// Given a batch panicked
/// When the next batch executes
/// Then it starts from the state before the panicking batch
#[tokio::test]
async fn state_survives_a_panicking_batch() {
    tokio::time::pause();

    let engine = KeyEngine::new(1, PanickingHasher { panic_on: 13 }, Config::default());

    assert_eq!(engine.submit(Instant::now(), vec![3]).await.unwrap(), 3.0);

    let result = engine.submit(Instant::now(), vec![13]).await;
    assert_matches!(result, Err(BatchError::Panic));
    assert_eq!(engine.last_result().await, 3.0);

    // (3 + 1) * 2
    assert_eq!(engine.submit(Instant::now(), vec![2]).await.unwrap(), 8.0);
}
