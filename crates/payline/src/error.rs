//! Error types for Payline.

use payline_core::{Address, CoreError, ReplayError};
use payline_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Payline operations.
///
/// Replay rejections are lifted out of the lower layers so callers can match
/// on them in one place, whichever layer detected them.
#[derive(Debug, Error)]
pub enum PaylineError {
    /// Signing, encoding or verification error.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// The promise does not advance its channel.
    #[error("replay rejected: {0}")]
    Replay(ReplayError),

    /// The promise pays someone other than the local identity.
    #[error("promise is addressed to {actual}, local identity is {expected}")]
    WrongReceiver { expected: Address, actual: Address },
}

impl From<CoreError> for PaylineError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Replay(r) => Self::Replay(r),
            other => Self::Core(other),
        }
    }
}

impl From<StoreError> for PaylineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Replay(r) => Self::Replay(r),
            other => Self::Store(other),
        }
    }
}

impl From<ReplayError> for PaylineError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

/// Result type for Payline operations.
pub type Result<T> = std::result::Result<T, PaylineError>;
