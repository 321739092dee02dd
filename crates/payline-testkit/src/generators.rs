//! Proptest generators for property-based testing.

use proptest::prelude::*;

use payline_core::{Address, ChannelPosition, Extra, Keccak256Hash, LocalSigner, Promise};

/// Generate a random address.
pub fn address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// Generate a random 32-byte digest.
pub fn keccak_hash() -> impl Strategy<Value = Keccak256Hash> {
    any::<[u8; 32]>().prop_map(Keccak256Hash::from_bytes)
}

/// Generate extra data, empty or fingerprinted.
pub fn extra() -> impl Strategy<Value = Extra> {
    prop_oneof![Just(Extra::Empty), keccak_hash().prop_map(Extra::Fingerprint)]
}

/// Generate a signer from a random valid scalar.
pub fn signer() -> impl Strategy<Value = LocalSigner> {
    any::<[u8; 32]>().prop_filter_map("scalar out of range", |secret| {
        LocalSigner::from_bytes(&secret).ok()
    })
}

/// Generate a channel position.
pub fn position() -> impl Strategy<Value = ChannelPosition> {
    (any::<u64>(), any::<u64>()).prop_map(|(seq_no, amount)| ChannelPosition { seq_no, amount })
}

/// Generate an arbitrary promise.
pub fn promise() -> impl Strategy<Value = Promise> {
    (extra(), address(), any::<u64>(), any::<u64>())
        .prop_map(|(extra, receiver, seq_no, amount)| Promise::new(extra, receiver, seq_no, amount))
}

/// Generate a channel history: strictly increasing seq_no, non-decreasing amount.
pub fn channel_history(max_len: usize) -> impl Strategy<Value = Vec<ChannelPosition>> {
    prop::collection::vec((1u64..=1000, 0u64..=1_000_000), 1..=max_len).prop_map(|steps| {
        let mut seq_no = 0u64;
        let mut amount = 0u64;
        steps
            .into_iter()
            .map(|(seq_step, amount_step)| {
                seq_no += seq_step;
                amount += amount_step;
                ChannelPosition { seq_no, amount }
            })
            .collect()
    })
}
