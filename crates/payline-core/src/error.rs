//! Error types for Payline Core.

use thiserror::Error;

use crate::crypto::Address;

/// Errors produced by a [`Signer`](crate::signer::Signer).
///
/// These are surfaced verbatim to the caller; nothing in this crate retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The key exists but is locked.
    #[error("signing key for {0} is locked")]
    Locked(Address),

    /// The signing operation was cancelled by the key custodian.
    #[error("signing cancelled")]
    Cancelled,

    /// The key custodian did not answer in time.
    #[error("signing timed out")]
    Timeout,

    /// Any other failure inside the key backend.
    #[error("signer backend failure: {0}")]
    Backend(String),
}

/// Errors from an inner serializer.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoding failed: {0}")]
    Encoding(String),

    #[error("decoding failed: {0}")]
    Decoding(String),
}

/// A promise that does not advance its channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("stale promise: seq_no {got} is not above last accepted {last}")]
    StaleSequence { last: u64, got: u64 },

    #[error("promise amount {got} is below last accepted amount {last}")]
    DecreasingAmount { last: u64, got: u64 },
}

/// Core errors that can occur during signing, encoding and verification.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The signature does not recover to a valid public key.
    #[error("signature recovery failed: {0}")]
    Recovery(String),

    /// The signature recovered, but to someone else.
    #[error("signed by {actual}, expected {expected}")]
    SignerMismatch { expected: Address, actual: Address },

    #[error("identity not found: {0}")]
    IdentityNotFound(Address),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("invalid private key")]
    InvalidKey,

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("promise amount overflow")]
    AmountOverflow,
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
