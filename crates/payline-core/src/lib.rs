//! # Payline Core
//!
//! Pure primitives for Payline: signatures, signed envelopes and payment
//! promises.
//!
//! This crate contains no I/O, no storage, no networking. Every operation is
//! call-and-return; the only thing that may block is a [`Signer`].
//!
//! ## Key Types
//!
//! - [`Signer`] / [`Keystore`] - Key custody seams
//! - [`SignedCodec`] - Wraps any [`Codec`] in a `{payload, signature}` envelope
//! - [`Promise`] -> [`IssuedPromise`] -> [`ReceivedPromise`] - Two-phase signed payment claims
//! - [`IdentityProofGenerator`] - Registration proofs
//!
//! ## Canonicalization
//!
//! Promises are signed over fixed-width big-endian bytes. See [`canonical`].

pub mod canonical;
pub mod codec;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod promise;
pub mod proof;
pub mod signer;
pub mod validation;

pub use canonical::{canonical_bytes, canonical_hash};
pub use codec::{CborCodec, Codec, JsonCodec};
pub use crypto::{verify_signature, Address, Keccak256Hash, Signature};
pub use envelope::{Envelope, SignedCodec};
pub use error::{CodecError, CoreError, ReplayError, SignerError};
pub use promise::{Extra, ExtraData, IssuedPromise, Promise, ReceivedPromise};
pub use proof::{IdentityProofGenerator, ProofOfIdentity};
pub use signer::{Keystore, LocalSigner, MemoryKeystore, Signer};
pub use validation::{check_monotonic, verify_received, ChannelPosition};
