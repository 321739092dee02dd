//! Configuration for Payline.

use std::path::PathBuf;

use payline_store::SqliteLedger;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`PromiseKeeper`](crate::PromiseKeeper).
///
/// Missing fields take their defaults, so a host can embed a partial table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaylineConfig {
    /// Path of the SQLite promise ledger.
    pub ledger_path: PathBuf,
    /// Reject promises that do not advance their channel.
    pub enforce_monotonic: bool,
    /// Check the receiver signature of already counter-signed promises.
    pub verify_receiver: bool,
}

impl Default for PaylineConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("promises.db"),
            enforce_monotonic: true,
            verify_receiver: true,
        }
    }
}

impl PaylineConfig {
    /// Open the SQLite ledger at `ledger_path`.
    pub fn open_ledger(&self) -> Result<SqliteLedger> {
        Ok(SqliteLedger::open(&self.ledger_path)?)
    }
}
