//! Errors.

use std::fmt::{self, Display};

use thiserror::Error;
use tokio::task::JoinError;

use crate::operation::Key;

/// An error that occurred while submitting an operation to be batched.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum BatchError<E: Display> {
    /// The operation was not admitted into any window.
    ///
    /// Recoverable. Nothing was folded and no state was changed.
    #[error("Operation expired: {0}")]
    Expired(ExpiryReason),

    /// The key is outside the range served by the calculator.
    #[error("Key {key} is out of range, the maximum key is {max_key}")]
    KeyOutOfRange {
        /// The key that was requested.
        key: Key,
        /// The largest key the calculator serves.
        max_key: Key,
    },

    /// A payload value could not be hashed. The whole batch was rejected and the key's state was
    /// left as it was before the batch.
    #[error("The batch fold failed: {0}")]
    FoldFailed(E),

    /// The batch execution was cancelled before completion.
    #[error("The batch was cancelled")]
    Cancelled,

    /// The batch execution panicked.
    #[error("The batch execution panicked")]
    Panic,
}

/// Why an operation expired before it could be admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExpiryReason {
    /// The operation's timestamp was older than the admission deadline when it was submitted.
    Stale,
    /// The selected window closed between being selected and the operation joining it.
    WindowClosed,
}

impl Display for ExpiryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExpiryReason::Stale => "the admission deadline has passed",
            ExpiryReason::WindowClosed => "the window closed before the operation could join",
        })
    }
}

/// Result type for batch operations.
pub type BatchResult<T, E> = std::result::Result<T, BatchError<E>>;

impl<E> BatchError<E>
where
    E: Display,
{
    /// Did the operation expire before admission?
    pub fn is_expired(&self) -> bool {
        matches!(self, BatchError::Expired(_))
    }

    /// Get the inner error for fold failures, otherwise self.
    pub fn inner(self) -> BatchResult<E, E> {
        match self {
            BatchError::FoldFailed(source) => Ok(source),
            _ => Err(self),
        }
    }
}

pub(crate) fn join_error_to_batch_error<E: Display>(join_err: JoinError) -> BatchError<E> {
    if join_err.is_cancelled() {
        BatchError::Cancelled
    } else {
        BatchError::Panic
    }
}
