//! # Payline Store
//!
//! The promise ledger: issuer-partitioned, append-only storage for received
//! promises, with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Ledger`] - The async trait for all ledger operations
//! - [`LedgerRecord`] - What a ledger can hold ([`ReceivedPromise`](payline_core::ReceivedPromise) by default)
//! - [`SqliteLedger`] - SQLite-based durable storage
//! - [`MemoryLedger`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use payline_store::{Ledger, SqliteLedger};
//! use payline_core::{Address, ReceivedPromise};
//!
//! async fn example(issuer: Address, receipt: ReceivedPromise) -> payline_store::Result<()> {
//!     let ledger: SqliteLedger = SqliteLedger::open("promises.db")?;
//!
//!     // Rejects the receipt if it does not advance its channel.
//!     ledger.store_next(&issuer, &receipt).await?;
//!
//!     let history = ledger.get_all(&issuer).await?;
//!     assert!(history.contains(&receipt));
//!
//!     ledger.close().await
//! }
//! ```

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerRecord};

/// Current time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
