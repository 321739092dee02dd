//! Identity proofs for on-chain registration.
//!
//! A proof binds an identity to a registration request: the identity's key
//! signs `REGISTRATION_DOMAIN || identity`. Proofs are handed straight to the
//! registration API and never stored here.

use serde::{Deserialize, Serialize};

use crate::canonical::registration_message;
use crate::crypto::{verify_signature, Address, Signature};
use crate::error::{CoreError, Result};
use crate::signer::Keystore;

/// Signed proof that the holder of `identity`'s key requested registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOfIdentity {
    pub identity: Address,
    pub signature: Signature,
}

impl ProofOfIdentity {
    /// Check that the signature recovers to `identity`.
    pub fn verify(&self) -> Result<()> {
        verify_signature(
            &registration_message(&self.identity),
            &self.signature,
            &self.identity,
        )
    }
}

/// Produces registration proofs using keys from a [`Keystore`].
pub struct IdentityProofGenerator<K> {
    keystore: K,
}

impl<K: Keystore> IdentityProofGenerator<K> {
    pub fn new(keystore: K) -> Self {
        Self { keystore }
    }

    /// Sign the registration message for `identity`.
    ///
    /// Fails with [`CoreError::IdentityNotFound`] if the keystore holds no key
    /// for it, or [`CoreError::Signing`] if the key refuses to sign.
    pub fn generate_proof_for_identity(&self, identity: &Address) -> Result<ProofOfIdentity> {
        let signer = self
            .keystore
            .signer_for(identity)
            .ok_or(CoreError::IdentityNotFound(*identity))?;
        let signature = signer.sign(&registration_message(identity))?;
        Ok(ProofOfIdentity {
            identity: *identity,
            signature,
        })
    }
}
