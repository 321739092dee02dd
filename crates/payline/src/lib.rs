//! # Payline
//!
//! Off-chain payment promises between peers of a bandwidth marketplace.
//!
//! ## Overview
//!
//! - **Envelopes**: every peer message is signed; the sender is recovered from the signature
//! - **Promises**: the payer signs a cumulative claim, the payee counter-signs it
//! - **Ledger**: accepted promises are stored per issuer and survive restarts
//! - **Identity proofs**: signed registration requests for on-chain identities
//!
//! ## Usage
//!
//! ```rust,no_run
//! use payline::{PaylineConfig, PromiseKeeper};
//! use payline::core::{Address, IssuedPromise, LocalSigner};
//!
//! async fn example(incoming: IssuedPromise, payer: Address) -> payline::Result<()> {
//!     let config = PaylineConfig::default();
//!     let ledger = config.open_ledger()?;
//!     let keeper = PromiseKeeper::new(LocalSigner::generate(), ledger, config);
//!
//!     // Verify, counter-sign and store in one step.
//!     let receipt = keeper.receive(incoming, &payer).await?;
//!     assert_eq!(keeper.latest(&payer).await?, Some(receipt));
//!
//!     keeper.close().await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `payline::core` - Signatures, envelopes, promises, identity proofs
//! - `payline::store` - Ledger trait, SQLite and in-memory ledgers

pub mod config;
pub mod error;
pub mod keeper;

// Re-export component crates
pub use payline_core as core;
pub use payline_store as store;

// Re-export main types for convenience
pub use config::PaylineConfig;
pub use error::{PaylineError, Result};
pub use keeper::PromiseKeeper;

// Re-export commonly used core types
pub use payline_core::{
    Address, Extra, IssuedPromise, Keccak256Hash, LocalSigner, Promise, ReceivedPromise,
    Signature, Signer,
};
pub use payline_store::{Ledger, MemoryLedger, SqliteLedger};
