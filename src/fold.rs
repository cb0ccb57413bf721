use std::{cmp::Reverse, collections::BinaryHeap, collections::HashMap};

use crate::{
    config::WorkDelay,
    hasher::ValueHasher,
    operation::{OperationId, Queued},
};

/// Running results are reduced into `[0, MODULUS)` after every folded value.
pub const MODULUS: f64 = 100_000.0;

/// Fold one hashed value into a running result.
///
/// The reduction subtracts the largest multiple of [`MODULUS`] not exceeding the product, using
/// `floor`, rather than taking a remainder with `%`. The two differ for negative products.
///
/// ```
/// use keyed_batcher::fold_value;
///
/// assert_eq!(fold_value(0.0, 7), 7.0);
/// assert_eq!(fold_value(7.0, 11), 88.0);
/// assert_eq!(fold_value(0.0, -3), 99_997.0);
/// ```
pub fn fold_value(acc: f64, hash: i32) -> f64 {
    let result = (acc + 1.0) * f64::from(hash);
    result - (result / MODULUS).floor() * MODULUS
}

/// Fold every value of a payload, in order.
pub(crate) fn fold_payload<H: ValueHasher>(
    hasher: &H,
    acc: f64,
    payload: &[H::Value],
) -> Result<f64, H::Error> {
    payload.iter().try_fold(acc, |acc, value| {
        hasher.hash_value(value).map(|hash| fold_value(acc, hash))
    })
}

/// A batch's final running value, and the running value after each of its operations.
pub(crate) type Folded = (f64, HashMap<OperationId, f64>);

/// Drain a window's pending heap in ascending order, folding each operation on top of the last.
///
/// Stops at the first value that fails to hash. Nothing is returned for the operations folded
/// before it.
pub(crate) async fn fold_batch<H: ValueHasher>(
    hasher: &H,
    work_delay: WorkDelay,
    seed: f64,
    mut pending: BinaryHeap<Reverse<Queued<H::Value>>>,
) -> Result<Folded, H::Error> {
    let mut result = seed;
    let mut results = HashMap::with_capacity(pending.len());

    while let Some(Reverse(Queued { id, op })) = pending.pop() {
        result = fold_payload(hasher, result, &op.payload)?;

        work_delay.simulate().await;

        results.insert(id, result);
    }

    Ok((result, results))
}
