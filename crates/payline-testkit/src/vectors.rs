//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding, the domain-tagged digests and
//! address derivation, so any other implementation can check it signs and
//! recovers exactly the same bytes.

use payline_core::canonical::{issuer_message, receiver_message};
use payline_core::{canonical_hash, Address, Extra, Keccak256Hash, Promise};

use crate::fixtures::Party;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Secret scalar of the issuer (see [`Party::seeded`]).
    pub issuer_seed: u8,
    /// Data fingerprinted into the extra field, or `None` for empty extra.
    pub extra_data: Option<&'static [u8]>,
    /// Receiver address (hex).
    pub receiver: &'static str,
    pub seq_no: u64,
    pub amount: u64,
    /// Expected issuer address (hex).
    pub expected_issuer: &'static str,
    /// Expected keccak256 of the canonical bytes (hex).
    pub expected_canonical_hash: &'static str,
    /// Expected keccak256 of the issuer message (hex).
    pub expected_issuer_digest: &'static str,
}

impl GoldenVector {
    /// The promise this vector describes.
    pub fn promise(&self) -> Promise {
        let extra = match self.extra_data {
            Some(data) => Extra::from_data(data),
            None => Extra::Empty,
        };
        let receiver = Address::from_hex(self.receiver).expect("vector receiver is valid hex");
        Promise::new(extra, receiver, self.seq_no, self.amount)
    }
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "empty extra, first promise",
            issuer_seed: 1,
            extra_data: None,
            receiver: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            seq_no: 1,
            amount: 100,
            expected_issuer: "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            expected_canonical_hash:
                "c7abb8d4d9618bfb4ea7fcd97ec0094a41cfb02a2dc8c7c3f03197edad884eb7",
            expected_issuer_digest:
                "c026e1023937ac538deca53e6fb0d475fcf1499f5eaca15904cd24c22ffa1293",
        },
        GoldenVector {
            name: "empty extra, second promise",
            issuer_seed: 1,
            extra_data: None,
            receiver: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            seq_no: 2,
            amount: 250,
            expected_issuer: "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            expected_canonical_hash:
                "275c39ab9599b4b9048594b7cb8927c3d6dca406b03ccd0a6714c9b8bdf8f393",
            expected_issuer_digest:
                "f13770659a70ea7c821b1a626219dcf28045cead641deb0e955998b16ce4a816",
        },
        GoldenVector {
            name: "fingerprinted session",
            issuer_seed: 3,
            extra_data: Some(b"session-42"),
            receiver: "0x2b5ad5c4795c026514f8317c7a215e218dccd6cf",
            seq_no: 7,
            amount: 1_000_000,
            expected_issuer: "0x6813eb9362372eef6200f3b1dbc3f819671cba69",
            expected_canonical_hash:
                "b656a812ccfba3a304cb40ba13b8f6dc50d951f43c59acf9c5e9c9853ec9de79",
            expected_issuer_digest:
                "8c147d8539a02c14f86f163c78e88732c61fb874657bd01d867699b82b853cb5",
        },
    ]
}

/// Receiver digest of the first vector, counter-signed over issuer `0x7e5f…5bdf`.
pub const FIRST_RECEIVER_DIGEST: &str =
    "b774e1dd4e493ca35fb7011506fa28a4ef086d044b89ff02872895404a9cf516";

/// Verify all golden vectors.
///
/// Returns `(name, matches, detail)` for each vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let promise = v.promise();
            let canonical = canonical_hash(&promise).to_hex();
            let digest = Keccak256Hash::hash(&issuer_message(&promise)).to_hex();
            let issued = Party::seeded(v.issuer_seed).issue(promise);
            let issuer = issued
                .issuer_address()
                .map(|a| a.to_string())
                .unwrap_or_default();

            let matches = canonical == v.expected_canonical_hash
                && digest == v.expected_issuer_digest
                && issuer == v.expected_issuer;

            (
                v.name.to_string(),
                matches,
                format!("canonical={canonical} digest={digest} issuer={issuer}"),
            )
        })
        .collect()
}

/// Keccak of the receiver message for `promise` counter-signed over `issuer`.
pub fn receiver_digest(promise: &Promise, issuer: &Address) -> Keccak256Hash {
    Keccak256Hash::hash(&receiver_message(promise, issuer))
}
