//! Canonical byte encoding of promises and the signed messages built on it.
//!
//! Layout, fixed order, no length prefixes:
//!
//! ```text
//! canonical_bytes = extra_hash (32) || receiver (20) || U256BE(seq_no) || U256BE(amount)
//! ```
//!
//! Integers are zero-padded to 32 bytes big-endian so the digest matches any
//! implementation that hashes 256-bit words. Every signed message starts with
//! a domain tag; a signature made in one role never verifies in another.

use crate::crypto::{Address, Keccak256Hash};
use crate::promise::{ExtraData, Promise};

/// Domain tag for the payer's signature over a promise.
pub const ISSUER_DOMAIN: &[u8] = b"Issuer prefix:";

/// Domain tag for the payee's counter-signature.
pub const RECEIVER_DOMAIN: &[u8] = b"Receiver prefix:";

/// Domain tag for identity registration proofs.
pub const REGISTRATION_DOMAIN: &[u8] = b"Register prefix:";

/// Length of [`canonical_bytes`] output.
pub const CANONICAL_LEN: usize = 32 + 20 + 32 + 32;

/// Encode a `u64` as a 256-bit big-endian word.
pub fn u256_be(n: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&n.to_be_bytes());
    out
}

/// Encode a promise to its canonical bytes.
pub fn canonical_bytes<E: ExtraData>(promise: &Promise<E>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CANONICAL_LEN);
    buf.extend_from_slice(promise.extra.hash().as_bytes());
    buf.extend_from_slice(promise.receiver.as_bytes());
    buf.extend_from_slice(&u256_be(promise.seq_no));
    buf.extend_from_slice(&u256_be(promise.amount));
    buf
}

/// Keccak-256 of the canonical bytes.
pub fn canonical_hash<E: ExtraData>(promise: &Promise<E>) -> Keccak256Hash {
    Keccak256Hash::hash(&canonical_bytes(promise))
}

/// The message the issuer signs: `ISSUER_DOMAIN || canonical_bytes`.
pub fn issuer_message<E: ExtraData>(promise: &Promise<E>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ISSUER_DOMAIN.len() + CANONICAL_LEN);
    buf.extend_from_slice(ISSUER_DOMAIN);
    buf.extend_from_slice(&canonical_bytes(promise));
    buf
}

/// The message the receiver signs:
/// `RECEIVER_DOMAIN || keccak256(canonical_bytes) || issuer`.
pub fn receiver_message<E: ExtraData>(promise: &Promise<E>, issuer: &Address) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECEIVER_DOMAIN.len() + 32 + 20);
    buf.extend_from_slice(RECEIVER_DOMAIN);
    buf.extend_from_slice(canonical_hash(promise).as_bytes());
    buf.extend_from_slice(issuer.as_bytes());
    buf
}

/// The message signed to prove control of `identity` at registration.
pub fn registration_message(identity: &Address) -> Vec<u8> {
    let mut buf = Vec::with_capacity(REGISTRATION_DOMAIN.len() + 20);
    buf.extend_from_slice(REGISTRATION_DOMAIN);
    buf.extend_from_slice(identity.as_bytes());
    buf
}
