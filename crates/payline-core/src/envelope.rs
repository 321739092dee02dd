//! Signed message envelope.
//!
//! Every peer-to-peer message is wrapped as `{payload, signature}` where
//! `payload` is the inner codec's serialization of the message, embedded
//! verbatim, and `signature` is the lowercase hex signature over those bytes.
//!
//! `unpack` only decodes. Checking who signed is an explicit second step,
//! [`SignedCodec::open`] followed by [`Envelope::verify`], performed by the
//! layer that knows which peer it expects.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::crypto::{verify_signature, Address, Signature};
use crate::error::Result;
use crate::signer::Signer;

/// Outbound wire form. Field order is part of the format.
#[derive(Serialize)]
struct WireEnvelope<'a, R> {
    payload: &'a R,
    signature: &'a str,
}

/// Inbound wire form.
#[derive(Deserialize)]
struct IncomingEnvelope<P> {
    payload: P,
    #[allow(dead_code)]
    signature: String,
}

/// A decoded envelope: payload bytes exactly as signed, plus the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub payload: Vec<u8>,
    pub signature: Signature,
}

impl Envelope {
    /// Recover the sender identity.
    pub fn signer(&self) -> Result<Address> {
        self.signature.recover(&self.payload)
    }

    /// Check that the envelope was signed by `expected`.
    pub fn verify(&self, expected: &Address) -> Result<()> {
        verify_signature(&self.payload, &self.signature, expected)
    }
}

/// A codec that signs everything it packs.
///
/// Owns exactly one inner codec and one signer, both injected here.
pub struct SignedCodec<C, S> {
    codec: C,
    signer: S,
}

impl<C: Codec, S: Signer> SignedCodec<C, S> {
    pub fn new(codec: C, signer: S) -> Self {
        Self { codec, signer }
    }

    /// The identity outbound envelopes are signed with.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The inner codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Serialize and sign a payload.
    pub fn pack<T: Serialize + ?Sized>(&self, payload: &T) -> Result<Vec<u8>> {
        let payload_bytes = self.codec.pack(payload)?;
        let signature = self.signer.sign(&payload_bytes)?;
        self.seal(&payload_bytes, &signature)
    }

    /// Wrap already serialized payload bytes with a given signature.
    pub fn seal(&self, payload_bytes: &[u8], signature: &Signature) -> Result<Vec<u8>> {
        let raw = self.codec.to_raw(payload_bytes)?;
        let signature = signature.to_hex();
        Ok(self.codec.pack(&WireEnvelope {
            payload: &raw,
            signature: &signature,
        })?)
    }

    /// Decode the payload into the caller's type. Does not verify.
    pub fn unpack<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let envelope: IncomingEnvelope<C::Raw> = self.codec.unpack(bytes)?;
        let payload = self.codec.from_raw(&envelope.payload)?;
        Ok(self.codec.unpack(&payload)?)
    }

    /// Decode the envelope into signed bytes and signature for verification.
    pub fn open(&self, bytes: &[u8]) -> Result<Envelope> {
        let envelope: IncomingEnvelope<C::Raw> = self.codec.unpack(bytes)?;
        let payload = self.codec.from_raw(&envelope.payload)?;
        let signature = Signature::from_hex(&envelope.signature)?;
        Ok(Envelope { payload, signature })
    }
}
