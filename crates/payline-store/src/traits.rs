//! Ledger trait: the abstract interface for promise persistence.
//!
//! Records are partitioned by issuer. Within a partition each record belongs
//! to a channel, and channels advance monotonically when written through
//! [`Ledger::store_next`].
//!
//! Every channel carries a high-water mark: the furthest position ever stored
//! in it. Deleting records never lowers the mark, so a settled promise cannot
//! be stored again.

use async_trait::async_trait;
use payline_core::{Address, ChannelPosition, ExtraData, ReceivedPromise};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A value that can be kept in a [`Ledger`].
pub trait LedgerRecord:
    Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static
{
    /// The channel this record belongs to within its issuer partition.
    fn channel(&self) -> Address;

    /// Sequence number and cumulative amount of this record.
    fn position(&self) -> ChannelPosition;
}

/// A received promise lives in the channel of its receiver.
impl<E> LedgerRecord for ReceivedPromise<E>
where
    E: ExtraData + Serialize + DeserializeOwned + Clone + PartialEq + Send + Sync + 'static,
{
    fn channel(&self) -> Address {
        self.promise().receiver
    }

    fn position(&self) -> ChannelPosition {
        self.promise().position()
    }
}

/// The Ledger trait: async interface for issuer-partitioned record storage.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Append-only**: records are never updated in place.
/// - **Linearizable per issuer**: concurrent calls never lose a write or
///   observe a half-written record.
/// - **Explicit deletes**: deleting a record that is not stored fails with
///   [`StoreError::NotFound`](crate::StoreError::NotFound). Deletes leave
///   channel high-water marks untouched.
/// - **No retries**: storage errors are returned as they happen.
/// - **Closed is final**: after [`Ledger::close`] every call fails with
///   [`StoreError::Closed`](crate::StoreError::Closed).
#[async_trait]
pub trait Ledger<R: LedgerRecord>: Send + Sync {
    /// Persist `record` under `issuer`. Performs no ordering check, but
    /// raises the channel's high-water mark.
    async fn store(&self, issuer: &Address, record: &R) -> Result<()>;

    /// Persist `record` only if it advances its channel.
    ///
    /// The high-water mark of the same (issuer, channel) is read, checked and
    /// raised in the same critical section as the write.
    async fn store_next(&self, issuer: &Address, record: &R) -> Result<()>;

    /// All records stored under `issuer`, in insertion order.
    async fn get_all(&self, issuer: &Address) -> Result<Vec<R>>;

    /// The stored record of a channel with the highest `seq_no`. Among equal
    /// sequence numbers the most recently stored wins.
    async fn last(&self, issuer: &Address, channel: &Address) -> Result<Option<R>>;

    /// The furthest position ever stored in a channel, including records
    /// since deleted.
    async fn high_water(
        &self,
        issuer: &Address,
        channel: &Address,
    ) -> Result<Option<ChannelPosition>>;

    /// Remove every stored copy of `record` from `issuer`'s partition.
    async fn delete(&self, issuer: &Address, record: &R) -> Result<()>;

    /// Every issuer with at least one stored record.
    async fn issuers(&self) -> Result<Vec<Address>>;

    /// Release the underlying storage.
    async fn close(&self) -> Result<()>;

    /// The sequence number the next record of a channel should carry.
    async fn next_seq_no(&self, issuer: &Address, channel: &Address) -> Result<u64> {
        Ok(self
            .high_water(issuer, channel)
            .await?
            .map_or(1, |mark| mark.seq_no.saturating_add(1)))
    }
}
