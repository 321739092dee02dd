//! In-memory implementation of the Ledger trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use payline_core::{check_monotonic, Address, ChannelPosition, ReceivedPromise};

use crate::error::{lock_poisoned, Result, StoreError};
use crate::traits::{Ledger, LedgerRecord};

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger<R = ReceivedPromise> {
    inner: RwLock<MemoryLedgerInner<R>>,
}

struct MemoryLedgerInner<R> {
    /// Records per issuer, in insertion order.
    partitions: BTreeMap<Address, Vec<R>>,
    /// High-water mark per (issuer, channel); never lowered by deletes.
    marks: BTreeMap<(Address, Address), ChannelPosition>,
    closed: bool,
}

impl<R> MemoryLedgerInner<R> {
    fn open(&self) -> Result<&Self> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(self)
    }

    fn open_mut(&mut self) -> Result<&mut Self> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        Ok(self)
    }
}

impl<R: LedgerRecord> MemoryLedgerInner<R> {
    fn last(&self, issuer: &Address, channel: &Address) -> Option<&R> {
        // max_by_key keeps the last of equal keys, i.e. the latest insert.
        self.partitions
            .get(issuer)?
            .iter()
            .filter(|r| &r.channel() == channel)
            .max_by_key(|r| r.position().seq_no)
    }

    fn mark(&self, issuer: &Address, channel: &Address) -> Option<ChannelPosition> {
        self.marks.get(&(*issuer, *channel)).copied()
    }

    fn append(&mut self, issuer: &Address, record: &R) {
        let position = record.position();
        self.marks
            .entry((*issuer, record.channel()))
            .and_modify(|mark| *mark = mark.raise(position))
            .or_insert(position);
        self.partitions
            .entry(*issuer)
            .or_default()
            .push(record.clone());
    }
}

impl<R> MemoryLedger<R> {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryLedgerInner {
                partitions: BTreeMap::new(),
                marks: BTreeMap::new(),
                closed: false,
            }),
        }
    }
}

impl<R> Default for MemoryLedger<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: LedgerRecord> Ledger<R> for MemoryLedger<R> {
    async fn store(&self, issuer: &Address, record: &R) -> Result<()> {
        let mut guard = self.inner.write().map_err(lock_poisoned)?;
        guard.open_mut()?.append(issuer, record);
        Ok(())
    }

    async fn store_next(&self, issuer: &Address, record: &R) -> Result<()> {
        let mut guard = self.inner.write().map_err(lock_poisoned)?;
        let inner = guard.open_mut()?;
        check_monotonic(inner.mark(issuer, &record.channel()), record.position())?;
        inner.append(issuer, record);
        Ok(())
    }

    async fn get_all(&self, issuer: &Address) -> Result<Vec<R>> {
        let guard = self.inner.read().map_err(lock_poisoned)?;
        let inner = guard.open()?;
        Ok(inner.partitions.get(issuer).cloned().unwrap_or_default())
    }

    async fn last(&self, issuer: &Address, channel: &Address) -> Result<Option<R>> {
        let guard = self.inner.read().map_err(lock_poisoned)?;
        let inner = guard.open()?;
        Ok(inner.last(issuer, channel).cloned())
    }

    async fn high_water(
        &self,
        issuer: &Address,
        channel: &Address,
    ) -> Result<Option<ChannelPosition>> {
        let guard = self.inner.read().map_err(lock_poisoned)?;
        Ok(guard.open()?.mark(issuer, channel))
    }

    async fn delete(&self, issuer: &Address, record: &R) -> Result<()> {
        let mut guard = self.inner.write().map_err(lock_poisoned)?;
        let inner = guard.open_mut()?;
        let not_found = || StoreError::NotFound(format!("no matching record under {issuer}"));

        let records = inner.partitions.get_mut(issuer).ok_or_else(not_found)?;
        let before = records.len();
        records.retain(|r| r != record);
        if records.len() == before {
            return Err(not_found());
        }
        if records.is_empty() {
            inner.partitions.remove(issuer);
        }
        Ok(())
    }

    async fn issuers(&self) -> Result<Vec<Address>> {
        let guard = self.inner.read().map_err(lock_poisoned)?;
        let inner = guard.open()?;
        Ok(inner.partitions.keys().copied().collect())
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.inner.write().map_err(lock_poisoned)?;
        guard.closed = true;
        guard.partitions.clear();
        guard.marks.clear();
        Ok(())
    }
}
