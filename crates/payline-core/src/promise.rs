//! Payment promises and the two-phase signing protocol.
//!
//! A promise moves strictly one way:
//!
//! ```text
//! Promise --sign_by_payer--> IssuedPromise --sign_by_receiver--> ReceivedPromise
//! ```
//!
//! Neither signed form stores an identity. The issuer is recovered from the
//! issuer signature, the receiver from the receiver signature, every time.

use serde::{Deserialize, Serialize};

use crate::canonical::{issuer_message, receiver_message};
use crate::crypto::{Address, Keccak256Hash, Signature};
use crate::error::{CoreError, Result};
use crate::signer::Signer;
use crate::validation::ChannelPosition;

/// Application-defined commitment carried by a promise.
///
/// Only its 32-byte hash enters the signed bytes.
pub trait ExtraData {
    fn hash(&self) -> Keccak256Hash;
}

/// The built-in extra data variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Extra {
    /// No commitment. Hashes to keccak256 of the empty string.
    #[default]
    Empty,
    /// Digest of a session or consumption record.
    Fingerprint(Keccak256Hash),
}

impl Extra {
    /// Fingerprint arbitrary application data.
    pub fn from_data(data: &[u8]) -> Self {
        Self::Fingerprint(Keccak256Hash::hash(data))
    }
}

impl ExtraData for Extra {
    fn hash(&self) -> Keccak256Hash {
        match self {
            Self::Empty => Keccak256Hash::hash(&[]),
            Self::Fingerprint(digest) => *digest,
        }
    }
}

/// "Payer owes `amount`, cumulative as of `seq_no`, to `receiver`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promise<E = Extra> {
    pub extra: E,
    pub receiver: Address,
    pub seq_no: u64,
    pub amount: u64,
}

impl<E: ExtraData> Promise<E> {
    pub fn new(extra: E, receiver: Address, seq_no: u64, amount: u64) -> Self {
        Self {
            extra,
            receiver,
            seq_no,
            amount,
        }
    }

    /// Where this promise sits in its channel.
    pub fn position(&self) -> ChannelPosition {
        ChannelPosition {
            seq_no: self.seq_no,
            amount: self.amount,
        }
    }

    /// The payer signs `ISSUER_DOMAIN || canonical_bytes`.
    pub fn sign_by_payer<S: Signer + ?Sized>(self, signer: &S) -> Result<IssuedPromise<E>> {
        let issuer_signature = signer.sign(&issuer_message(&self))?;
        Ok(IssuedPromise {
            promise: self,
            issuer_signature,
        })
    }
}

impl<E: ExtraData + Clone> Promise<E> {
    /// The following promise in the same channel, owing `increment` more.
    pub fn next(&self, increment: u64) -> Result<Self> {
        let seq_no = self.seq_no.checked_add(1).ok_or(CoreError::AmountOverflow)?;
        let amount = self
            .amount
            .checked_add(increment)
            .ok_or(CoreError::AmountOverflow)?;
        Ok(Self {
            extra: self.extra.clone(),
            receiver: self.receiver,
            seq_no,
            amount,
        })
    }
}

/// A promise signed by its payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedPromise<E = Extra> {
    promise: Promise<E>,
    issuer_signature: Signature,
}

impl<E: ExtraData> IssuedPromise<E> {
    pub fn promise(&self) -> &Promise<E> {
        &self.promise
    }

    pub fn issuer_signature(&self) -> &Signature {
        &self.issuer_signature
    }

    /// Recover the payer from the issuer signature.
    pub fn issuer_address(&self) -> Result<Address> {
        self.issuer_signature.recover(&issuer_message(&self.promise))
    }

    /// The payee counter-signs
    /// `RECEIVER_DOMAIN || keccak256(canonical_bytes) || issuer`.
    ///
    /// Fails without signing if the issuer cannot be recovered.
    pub fn sign_by_receiver<S: Signer + ?Sized>(self, signer: &S) -> Result<ReceivedPromise<E>> {
        let issuer = self.issuer_address()?;
        let receiver_signature = signer.sign(&receiver_message(&self.promise, &issuer))?;
        Ok(ReceivedPromise {
            issued: self,
            receiver_signature,
        })
    }

    pub fn into_promise(self) -> Promise<E> {
        self.promise
    }
}

/// A promise signed by both parties; the unit stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedPromise<E = Extra> {
    issued: IssuedPromise<E>,
    receiver_signature: Signature,
}

impl<E: ExtraData> ReceivedPromise<E> {
    pub fn issued(&self) -> &IssuedPromise<E> {
        &self.issued
    }

    pub fn promise(&self) -> &Promise<E> {
        &self.issued.promise
    }

    pub fn receiver_signature(&self) -> &Signature {
        &self.receiver_signature
    }

    pub fn issuer_address(&self) -> Result<Address> {
        self.issued.issuer_address()
    }

    /// Recover the payee from the receiver signature.
    pub fn receiver_address(&self) -> Result<Address> {
        let issuer = self.issuer_address()?;
        self.receiver_signature
            .recover(&receiver_message(self.promise(), &issuer))
    }
}
