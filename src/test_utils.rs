use crate::ValueHasher;

/// Hashes an integer to itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdentityHasher;

impl ValueHasher for IdentityHasher {
    type Value = i32;
    type Error = String;

    fn hash_value(&self, value: &i32) -> Result<i32, String> {
        Ok(*value)
    }
}

/// Hashes non-negative integers to themselves and refuses negative ones.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FailingHasher;

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
