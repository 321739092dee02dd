//! SQLite implementation of the Ledger trait.
//!
//! This is the durable backend for Payline. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;

use payline_core::{check_monotonic, Address, ChannelPosition, ReceivedPromise};

use crate::error::{lock_poisoned, Result, StoreError};
use crate::migration;
use crate::traits::{Ledger, LedgerRecord};

/// SQLite-based ledger.
///
/// Thread-safe via internal Mutex, which also makes every operation
/// linearizable. All operations use spawn_blocking to avoid blocking the
/// async runtime. The connection is dropped on close.
pub struct SqliteLedger<R = ReceivedPromise> {
    conn: Arc<Mutex<Option<Connection>>>,
    _record: PhantomData<fn() -> R>,
}

impl<R: LedgerRecord> SqliteLedger<R> {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file (and missing parent directories) and runs migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let ledger = Self::from_connection(Connection::open(path)?)?;
        tracing::debug!(path = %path.display(), "opened promise ledger");
        Ok(ledger)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            _record: PhantomData,
        })
    }

    /// Run a blocking operation on the open connection.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(lock_poisoned)?;
            let conn = guard.as_mut().ok_or(StoreError::Closed)?;
            f(conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }

    /// Append a record in an IMMEDIATE transaction, optionally checking order.
    async fn write(&self, issuer: &Address, record: &R, check: bool) -> Result<()> {
        let issuer = issuer.to_string();
        let channel = record.channel().to_string();
        let position = record.position();
        let bytes = encode(record)?;

        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            append(&tx, &issuer, &channel, position, &bytes, check)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

fn encode<R: Serialize>(record: &R) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(record, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    ciborium::from_reader(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn read_u64(bytes: &[u8]) -> Result<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StoreError::InvalidData(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(arr))
}

fn high_water_mark(
    conn: &Connection,
    issuer: &str,
    channel: &str,
) -> Result<Option<ChannelPosition>> {
    let row: Option<(Vec<u8>, Vec<u8>)> = conn
        .query_row(
            "SELECT seq_no, amount FROM channels WHERE issuer = ?1 AND channel = ?2",
            params![issuer, channel],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    row.map(|(seq_no, amount)| -> Result<ChannelPosition> {
        Ok(ChannelPosition {
            seq_no: read_u64(&seq_no)?,
            amount: read_u64(&amount)?,
        })
    })
    .transpose()
}

/// Insert a record and raise its channel mark. Call inside a transaction.
fn append(
    conn: &Connection,
    issuer: &str,
    channel: &str,
    position: ChannelPosition,
    record: &[u8],
    check: bool,
) -> Result<()> {
    let mark = high_water_mark(conn, issuer, channel)?;
    if check {
        check_monotonic(mark, position)?;
    }

    conn.execute(
        "INSERT INTO promises (issuer, channel, seq_no, record, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            issuer,
            channel,
            &position.seq_no.to_be_bytes()[..],
            record,
            crate::now_millis()
        ],
    )?;

    let raised = mark.map_or(position, |mark| mark.raise(position));
    conn.execute(
        "INSERT OR REPLACE INTO channels (issuer, channel, seq_no, amount)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            issuer,
            channel,
            &raised.seq_no.to_be_bytes()[..],
            &raised.amount.to_be_bytes()[..]
        ],
    )?;
    Ok(())
}

fn last_in_channel<R: DeserializeOwned>(
    conn: &Connection,
    issuer: &str,
    channel: &str,
) -> Result<Option<R>> {
    let bytes: Option<Vec<u8>> = conn
        .query_row(
            "SELECT record FROM promises
             WHERE issuer = ?1 AND channel = ?2
             ORDER BY seq_no DESC, id DESC LIMIT 1",
            params![issuer, channel],
            |row| row.get(0),
        )
        .optional()?;
    bytes.map(|b| decode(&b)).transpose()
}

#[async_trait]
impl<R: LedgerRecord> Ledger<R> for SqliteLedger<R> {
    async fn store(&self, issuer: &Address, record: &R) -> Result<()> {
        self.write(issuer, record, false).await
    }

    async fn store_next(&self, issuer: &Address, record: &R) -> Result<()> {
        self.write(issuer, record, true).await
    }

    async fn get_all(&self, issuer: &Address) -> Result<Vec<R>> {
        let issuer = issuer.to_string();

        self.run(move |conn| {
            let mut stmt =
                conn.prepare("SELECT record FROM promises WHERE issuer = ?1 ORDER BY id")?;
            let rows = stmt.query_map(params![issuer], |row| row.get::<_, Vec<u8>>(0))?;

            let mut records = Vec::new();
            for row in rows {
                records.push(decode(&row?)?);
            }
            Ok(records)
        })
        .await
    }

    async fn last(&self, issuer: &Address, channel: &Address) -> Result<Option<R>> {
        let issuer = issuer.to_string();
        let channel = channel.to_string();

        self.run(move |conn| last_in_channel(conn, &issuer, &channel))
            .await
    }

    async fn high_water(
        &self,
        issuer: &Address,
        channel: &Address,
    ) -> Result<Option<ChannelPosition>> {
        let issuer = issuer.to_string();
        let channel = channel.to_string();

        self.run(move |conn| high_water_mark(conn, &issuer, &channel))
            .await
    }

    async fn delete(&self, issuer: &Address, record: &R) -> Result<()> {
        let issuer = issuer.to_string();
        let bytes = encode(record)?;

        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM promises WHERE issuer = ?1 AND record = ?2",
                params![issuer, bytes],
            )?;
            if removed == 0 {
                return Err(StoreError::NotFound(format!("no matching record under {issuer}")));
            }
            tracing::debug!(%issuer, removed, "deleted promise records");
            Ok(())
        })
        .await
    }

    async fn issuers(&self) -> Result<Vec<Address>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT DISTINCT issuer FROM promises ORDER BY issuer")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

            let mut issuers = Vec::new();
            for row in rows {
                let text = row?;
                let issuer = Address::from_hex(&text)
                    .map_err(|e| StoreError::InvalidData(format!("issuer {text}: {e}")))?;
                issuers.push(issuer);
            }
            Ok(issuers)
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(lock_poisoned)?;
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| StoreError::Database(e))?;
                tracing::debug!("closed promise ledger");
            }
            Ok(())
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payline_core::ReplayError;
    use payline_testkit::fixtures::{received, Party};

    #[tokio::test]
    async fn test_store_and_get_all() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        let r1 = received(&payer, &payee, 1, 100);
        let r2 = received(&payer, &payee, 2, 150);
        ledger.store(&payer.address(), &r1).await.unwrap();
        ledger.store(&payer.address(), &r2).await.unwrap();

        let all = ledger.get_all(&payer.address()).await.unwrap();
        assert_eq!(all, vec![r1, r2]);
    }

    #[tokio::test]
    async fn test_partition_isolation() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let a = Party::seeded(1);
        let b = Party::seeded(3);
        let payee = Party::seeded(2);

        let record = received(&a, &payee, 1, 10);
        ledger.store(&a.address(), &record).await.unwrap();

        assert!(ledger.get_all(&b.address()).await.unwrap().is_empty());
        assert_eq!(ledger.issuers().await.unwrap(), vec![a.address()]);
    }

    #[tokio::test]
    async fn test_store_next_rejects_replay() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        ledger
            .store_next(&payer.address(), &received(&payer, &payee, 1, 100))
            .await
            .unwrap();

        let stale = received(&payer, &payee, 1, 50);
        let err = ledger.store_next(&payer.address(), &stale).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Replay(ReplayError::StaleSequence { last: 1, got: 1 })
        ));

        let shrinking = received(&payer, &payee, 2, 99);
        let err = ledger
            .store_next(&payer.address(), &shrinking)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Replay(ReplayError::DecreasingAmount { last: 100, got: 99 })
        ));

        // Nothing rejected was written.
        assert_eq!(ledger.get_all(&payer.address()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_channels_advance_independently() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee_a = Party::seeded(2);
        let payee_b = Party::seeded(3);

        ledger
            .store_next(&payer.address(), &received(&payer, &payee_a, 5, 500))
            .await
            .unwrap();
        ledger
            .store_next(&payer.address(), &received(&payer, &payee_b, 1, 1))
            .await
            .unwrap();

        assert_eq!(
            ledger
                .next_seq_no(&payer.address(), &payee_a.address())
                .await
                .unwrap(),
            6
        );
        assert_eq!(
            ledger
                .next_seq_no(&payer.address(), &payee_b.address())
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            ledger
                .next_seq_no(&payer.address(), &Party::seeded(9).address())
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_last_returns_latest() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        assert!(ledger
            .last(&payer.address(), &payee.address())
            .await
            .unwrap()
            .is_none());

        for seq in 1..=3 {
            ledger
                .store_next(&payer.address(), &received(&payer, &payee, seq, seq * 10))
                .await
                .unwrap();
        }

        let last = ledger
            .last(&payer.address(), &payee.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.promise().seq_no, 3);
    }

    #[tokio::test]
    async fn test_delete() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let r1 = received(&payer, &payee, 1, 100);
        let r2 = received(&payer, &payee, 2, 200);

        ledger.store(&payer.address(), &r1).await.unwrap();
        ledger.store(&payer.address(), &r2).await.unwrap();

        ledger.delete(&payer.address(), &r1).await.unwrap();
        assert_eq!(ledger.get_all(&payer.address()).await.unwrap(), vec![r2]);

        let err = ledger.delete(&payer.address(), &r1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        // Same record under another issuer is a different record.
        let err = ledger
            .delete(&Party::seeded(4).address(), &received(&payer, &payee, 2, 200))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleted_record_cannot_be_stored_again() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let record = received(&payer, &payee, 1, 100);

        ledger.store_next(&payer.address(), &record).await.unwrap();
        ledger.delete(&payer.address(), &record).await.unwrap();

        let err = ledger
            .store_next(&payer.address(), &record)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Replay(ReplayError::StaleSequence { last: 1, got: 1 })
        ));
        assert!(ledger.get_all(&payer.address()).await.unwrap().is_empty());
        assert_eq!(
            ledger
                .high_water(&payer.address(), &payee.address())
                .await
                .unwrap(),
            Some(ChannelPosition {
                seq_no: 1,
                amount: 100
            })
        );
        assert_eq!(
            ledger
                .next_seq_no(&payer.address(), &payee.address())
                .await
                .unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn test_out_of_order_import() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        ledger
            .store(&payer.address(), &received(&payer, &payee, 5, 50))
            .await
            .unwrap();
        ledger
            .store(&payer.address(), &received(&payer, &payee, 2, 20))
            .await
            .unwrap();

        let err = ledger
            .store_next(&payer.address(), &received(&payer, &payee, 3, 60))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Replay(ReplayError::StaleSequence { last: 5, got: 3 })
        ));

        let last = ledger
            .last(&payer.address(), &payee.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.promise().seq_no, 5);
    }

    #[tokio::test]
    async fn test_last_orders_by_sequence_bytewise() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        // 256 sorts below 255 as a little-endian key.
        ledger
            .store(&payer.address(), &received(&payer, &payee, 256, 1))
            .await
            .unwrap();
        ledger
            .store(&payer.address(), &received(&payer, &payee, 255, 1))
            .await
            .unwrap();

        let last = ledger
            .last(&payer.address(), &payee.address())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.promise().seq_no, 256);
    }

    #[tokio::test]
    async fn test_closed_ledger_fails() {
        let ledger: SqliteLedger = SqliteLedger::open_memory().unwrap();
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        ledger.close().await.unwrap();
        ledger.close().await.unwrap();

        let record = received(&payer, &payee, 1, 1);
        assert!(matches!(
            ledger.store(&payer.address(), &record).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(
            ledger.get_all(&payer.address()).await,
            Err(StoreError::Closed)
        ));
        assert!(matches!(ledger.issuers().await, Err(StoreError::Closed)));
    }

    #[tokio::test]
    async fn test_durable_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("promises.db");
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);
        let record = received(&payer, &payee, 1, 100);

        {
            let ledger: SqliteLedger = SqliteLedger::open(&path).unwrap();
            ledger.store(&payer.address(), &record).await.unwrap();
            ledger.close().await.unwrap();
        }

        let ledger: SqliteLedger = SqliteLedger::open(&path).unwrap();
        assert_eq!(ledger.get_all(&payer.address()).await.unwrap(), vec![record]);
        assert_eq!(ledger.issuers().await.unwrap(), vec![payer.address()]);
    }

    #[tokio::test]
    async fn test_concurrent_store_next_same_channel() {
        let ledger: Arc<SqliteLedger> = Arc::new(SqliteLedger::open_memory().unwrap());
        let payer = Party::seeded(1);
        let payee = Party::seeded(2);

        // Every task races the same seq_no; exactly one may win.
        let mut handles = Vec::new();
        for amount in 0..8u64 {
            let ledger = Arc::clone(&ledger);
            let issuer = payer.address();
            let record = received(&payer, &payee, 1, amount);
            handles.push(tokio::spawn(async move {
                ledger.store_next(&issuer, &record).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(ledger.get_all(&payer.address()).await.unwrap().len(), 1);
    }
}
