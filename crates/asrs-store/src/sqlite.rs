//! SQLite backend (feature `sqlite`).
//!
//! Creates a single `inventory.db` in the store directory:
//!
//! ```text
//! snapshots(seq, body)                         body = JSON RegistrySnapshot
//! events(seq PRIMARY KEY, tick, job, box_id, rack, operation, sku, path_len, body)
//! job_ids(id = 0, through)                      single row
//! ```
//!
//! The event columns duplicate the JSON body so the journal can be queried
//! directly; recovery reads `body` only.  Re-inserting a `seq` with an
//! identical body is a no-op, so a commit whose transaction landed but
//! reported an error can be retried.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use asrs_registry::RegistrySnapshot;

use crate::{InventoryEvent, PersistenceGateway, Recovered, StoreError, StoreResult};

pub struct SqliteGateway {
    conn: Mutex<Connection>,
}

impl SqliteGateway {
    /// Open (or create) `inventory.db` in `dir` and initialise the schema.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("inventory.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = FULL;
             CREATE TABLE IF NOT EXISTS snapshots (
                 seq  INTEGER NOT NULL,
                 body TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS events (
                 seq       INTEGER PRIMARY KEY,
                 tick      INTEGER NOT NULL,
                 job       INTEGER NOT NULL,
                 box_id    INTEGER NOT NULL,
                 rack      INTEGER NOT NULL,
                 operation TEXT    NOT NULL,
                 sku       TEXT    NOT NULL,
                 path_len  INTEGER NOT NULL,
                 body      TEXT    NOT NULL
             );
             CREATE TABLE IF NOT EXISTS job_ids (
                 id      INTEGER PRIMARY KEY CHECK (id = 0),
                 through INTEGER NOT NULL
             );",
        )?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn events_after(conn: &Connection, seq: u64) -> StoreResult<Vec<InventoryEvent>> {
        let mut stmt = conn.prepare_cached("SELECT body FROM events WHERE seq > ?1 ORDER BY seq")?;
        let bodies = stmt
            .query_map(params![seq as i64], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(Into::into))
            .collect()
    }
}

impl PersistenceGateway for SqliteGateway {
    fn snapshot(&self, seq: u64, snapshot: &RegistrySnapshot) -> StoreResult<()> {
        let body = serde_json::to_string(snapshot)?;
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        // Only the latest snapshot is ever read back.
        tx.execute("DELETE FROM snapshots", [])?;
        tx.execute("INSERT INTO snapshots (seq, body) VALUES (?1, ?2)", params![seq as i64, body])?;
        tx.commit()?;
        Ok(())
    }

    fn append_event(&self, event: &InventoryEvent) -> StoreResult<()> {
        let body = serde_json::to_string(event)?;
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let inserted = {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO events \
                 (seq, tick, job, box_id, rack, operation, sku, path_len, body) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
                 ON CONFLICT (seq) DO NOTHING",
            )?;
            stmt.execute(params![
                event.seq as i64,
                event.tick.0 as i64,
                event.job.0 as i64,
                event.change.box_id().0,
                event.change.rack().0,
                event.change.operation(),
                event.sku,
                event.path_len,
                body,
            ])?
        };
        if inserted == 0 {
            let existing: String =
                tx.query_row("SELECT body FROM events WHERE seq = ?1", params![event.seq as i64], |row| row.get(0))?;
            if existing != body {
                return Err(StoreError::SeqConflict(event.seq));
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn reserve_job_ids(&self, through: u64) -> StoreResult<()> {
        self.conn().execute(
            "INSERT INTO job_ids (id, through) VALUES (0, ?1) \
             ON CONFLICT (id) DO UPDATE SET through = max(through, excluded.through)",
            params![through as i64],
        )?;
        Ok(())
    }

    fn recover(&self) -> StoreResult<Recovered> {
        let conn = self.conn();
        let latest: Option<(i64, String)> = conn
            .query_row("SELECT seq, body FROM snapshots ORDER BY seq DESC LIMIT 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;
        let (snapshot_seq, snapshot) = match latest {
            Some((seq, body)) => (seq as u64, serde_json::from_str(&body)?),
            None => (0, RegistrySnapshot::default()),
        };
        let events = Self::events_after(&conn, snapshot_seq)?;
        let job_ids: Option<i64> = conn
            .query_row("SELECT through FROM job_ids WHERE id = 0", [], |row| row.get(0))
            .optional()?;
        Ok(Recovered::new(snapshot, snapshot_seq, events, job_ids.map_or(0, |n| n as u64)))
    }

    fn journal(&self) -> StoreResult<Vec<InventoryEvent>> {
        Self::events_after(&self.conn(), 0)
    }

    fn finish(&self) -> StoreResult<()> {
        self.conn().execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
