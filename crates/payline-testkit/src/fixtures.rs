//! Test fixtures and helpers.
//!
//! Common setup code for unit and integration tests.

use payline_core::{
    Address, Extra, IssuedPromise, LocalSigner, Promise, ReceivedPromise, Signer,
};

/// A protocol participant with a deterministic key.
#[derive(Debug, Clone)]
pub struct Party {
    pub signer: LocalSigner,
}

impl Party {
    /// A party whose secret scalar is `n` (big-endian, zero padded).
    ///
    /// `Party::seeded(1)` has address `0x7e5f4552091a69125d5dfcb7b8c2659029395bdf`.
    pub fn seeded(n: u8) -> Self {
        let mut secret = [0u8; 32];
        secret[31] = n.max(1);
        let signer = LocalSigner::from_bytes(&secret).expect("small scalars are valid keys");
        Self { signer }
    }

    /// A party with a fresh random key.
    pub fn random() -> Self {
        Self {
            signer: LocalSigner::generate(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Sign a promise as payer.
    pub fn issue(&self, promise: Promise) -> IssuedPromise {
        promise
            .sign_by_payer(&self.signer)
            .expect("local signer does not fail")
    }

    /// Counter-sign an issued promise as payee.
    pub fn countersign(&self, issued: IssuedPromise) -> ReceivedPromise {
        issued
            .sign_by_receiver(&self.signer)
            .expect("issuer signature recovers")
    }
}

/// A promise from `payer` to `receiver` with empty extra data.
pub fn issued(payer: &Party, receiver: Address, seq_no: u64, amount: u64) -> IssuedPromise {
    payer.issue(Promise::new(Extra::Empty, receiver, seq_no, amount))
}

/// A promise from `payer` to `payee`, signed by both.
pub fn received(payer: &Party, payee: &Party, seq_no: u64, amount: u64) -> ReceivedPromise {
    payee.countersign(issued(payer, payee.address(), seq_no, amount))
}

/// Create parties with distinct deterministic keys (scalars 1..=count).
pub fn parties(count: u8) -> Vec<Party> {
    (1..=count).map(Party::seeded).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_is_deterministic() {
        assert_eq!(Party::seeded(1).address(), Party::seeded(1).address());
        assert_eq!(
            Party::seeded(1).address().to_string(),
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf"
        );
    }

    #[test]
    fn test_received_is_fully_signed() {
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let receipt = received(&payer, &payee, 4, 40);

        assert_eq!(receipt.issuer_address().unwrap(), payer.address());
        assert_eq!(receipt.receiver_address().unwrap(), payee.address());
        assert_eq!(receipt.promise().receiver, payee.address());
    }

    #[test]
    fn test_parties_distinct() {
        let ps = parties(3);
        assert_ne!(ps[0].address(), ps[1].address());
        assert_ne!(ps[1].address(), ps[2].address());
        assert_ne!(ps[0].address(), ps[2].address());
    }
}
