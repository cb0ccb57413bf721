use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use keyed_batcher::{KeyEngine, ValueHasher};

/// Hashes an integer to itself, so expected results are easy to work out by hand.
#[derive(Debug, Clone, Copy)]
pub struct IdentityHasher;

impl ValueHasher for IdentityHasher {
    type Value = i32;
    type Error = String;

    fn hash_value(&self, value: &i32) -> Result<i32, String> {
        Ok(*value)
    }
}

/// Hashes an integer to itself, counting how many values it has hashed.
#[derive(Debug, Clone, Default)]
pub struct CountingHasher {
    calls: Arc<AtomicUsize>,
}

impl CountingHasher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ValueHasher for CountingHasher {
    type Value = i32;
    type Error = String;

    fn hash_value(&self, value: &i32) -> Result<i32, String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(*value)
    }
}

/// Hashes non-negative integers to themselves and refuses negative ones.
#[derive(Debug, Clone, Copy)]
pub struct FailingHasher;

impl ValueHasher for FailingHasher {
    type Value = i32;
    type Error = String;

    fn hash_value(&self, value: &i32) -> Result<i32, String> {
        if *value < 0 {
            Err(format!("cannot hash {value}"))
        } else {
            Ok(*value)
        }
    }
}

/// A [KeyEngine] should be shareable between tasks, even when the values aren't cloneable.
#[allow(unused)]
struct NotCloneable;

#[derive(Clone)]
#[allow(unused)]
struct NotCloneableHasher;

impl ValueHasher for NotCloneableHasher {
    type Value = NotCloneable;
    type Error = String;

    fn hash_value(&self, _value: &NotCloneable) -> Result<i32, String> {
        Ok(1)
    }
}

#[allow(unused)]
fn assert_send_sync<T: Send + Sync>() {}

#[allow(unused)]
fn engine_is_send_and_sync() {
    assert_send_sync::<KeyEngine<NotCloneableHasher>>();
}
