//! # Payline Testkit
//!
//! Testing utilities for Payline.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known promises with expected digests and issuers for cross-platform verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic parties and pre-signed promises
//!
//! ## Golden Vectors
//!
//! ```rust
//! use payline_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, detail) in verify_all_vectors() {
//!     assert!(matches, "{name}: {detail}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use payline_testkit::generators::promise;
//!
//! proptest! {
//!     #[test]
//!     fn canonical_bytes_are_deterministic(p in promise()) {
//!         prop_assert_eq!(canonical_bytes(&p), canonical_bytes(&p));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use payline_testkit::fixtures::{received, Party};
//!
//! let payer = Party::seeded(1);
//! let payee = Party::seeded(2);
//! let receipt = received(&payer, &payee, 1, 100);
//! assert_eq!(receipt.issuer_address().unwrap(), payer.address());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{issued, parties, received, Party};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
