//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, crate::now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: promise ledger.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per stored record; id gives insertion order
        CREATE TABLE promises (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            issuer TEXT NOT NULL,             -- 0x-prefixed lowercase address, partition key
            channel TEXT NOT NULL,            -- 0x-prefixed lowercase address
            seq_no BLOB NOT NULL,             -- u64 big-endian, sorts bytewise
            record BLOB NOT NULL,             -- CBOR encoded record
            stored_at INTEGER NOT NULL        -- local timestamp (Unix ms)
        );

        CREATE INDEX idx_promises_issuer ON promises(issuer, id);
        CREATE INDEX idx_promises_channel ON promises(issuer, channel, seq_no, id);

        -- Furthest position ever stored per channel; deletes do not touch it
        CREATE TABLE channels (
            issuer TEXT NOT NULL,
            channel TEXT NOT NULL,
            seq_no BLOB NOT NULL,             -- u64 big-endian
            amount BLOB NOT NULL,             -- u64 big-endian
            PRIMARY KEY (issuer, channel)
        );
        "#,
    )?;

    Ok(())
}
