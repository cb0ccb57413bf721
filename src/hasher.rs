use std::{
    convert::Infallible,
    fmt::{self, Debug, Display},
    hash::{DefaultHasher, Hash, Hasher},
    marker::PhantomData,
};

/// Turns payload values into the integers that get folded into a key's running result.
///
/// Should be cheap to clone. Every key engine holds its own clone.
pub trait ValueHasher: 'static + Send + Sync + Clone {
    /// A single payload value.
    type Value: 'static + Send;
    /// The error returned when a value can't be hashed.
    type Error: 'static + Send + Sync + Clone + Display + Debug;

    /// Hash a payload value.
    ///
    /// Must be deterministic: the same value always hashes to the same integer. Returning an error
    /// rejects the whole batch the value's operation belongs to.
    fn hash_value(&self, value: &Self::Value) -> Result<i32, Self::Error>;
}

/// Hashes any [`Hash`] value with the standard library's default hasher.
///
/// The 64-bit hash is folded down to 32 bits by XORing its halves. Never fails.
pub struct StdHasher<V> {
    _value: PhantomData<fn(&V)>,
}

impl<V> StdHasher<V> {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<V> ValueHasher for StdHasher<V>
where
    V: 'static + Send + Hash,
{
    type Value = V;
    type Error = Infallible;

    fn hash_value(&self, value: &V) -> Result<i32, Infallible> {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        let hash = hasher.finish();
        Ok((hash ^ (hash >> 32)) as i32)
    }
}

impl<V> Clone for StdHasher<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> Default for StdHasher<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for StdHasher<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdHasher").finish()
    }
}
