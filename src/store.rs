//! SQLite-backed persistent store for indicator state.
//!
//! All tables are owned here; components hold an `Arc<Store>` and never cache
//! authoritative state beyond one logical operation. One connection guarded
//! by a mutex, WAL journaling, short busy timeout — each method acquires the
//! lock for the duration of its statement or transaction, so every logical
//! operation commits or rolls back before returning.

use crate::error::{is_unique_violation, Error};
use crate::types::{
    BlockEntry, EntryStatus, ExistingBlock, Kind, NewBlockEntry, Report, ReportStatus,
    WhitelistEntry,
};
use crate::version::{data_type, TrackedList};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub struct Store {
    conn: Mutex<Connection>,
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

impl Store {
    pub fn open(db_path: &str) -> Result<Self, Error> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Creates missing tables and indexes. Idempotent.
    ///
    /// The blocklist uniqueness lives in a separate index because databases
    /// written before it existed can hold duplicate rows; those must be
    /// repaired with the deduplicator before this schema can be applied.
    pub fn init_schema(&self) -> Result<(), Error> {
        let conn = self.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocklist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                reason TEXT,
                source TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                added_at INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_blocklist_kind_value
                ON blocklist (kind, value);
            CREATE INDEX IF NOT EXISTS idx_blocklist_active
                ON blocklist (kind, status, added_at);

            CREATE TABLE IF NOT EXISTS whitelist (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                reason TEXT,
                added_by TEXT,
                added_at INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_whitelist_kind_value
                ON whitelist (kind, value);

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                value TEXT NOT NULL,
                reason TEXT,
                source TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                reported_at INTEGER NOT NULL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_reports_pending
                ON reports (kind, value) WHERE status = 'pending';
            CREATE INDEX IF NOT EXISTS idx_reports_value
                ON reports (kind, value);

            CREATE TABLE IF NOT EXISTS data_version (
                data_type TEXT PRIMARY KEY,
                version INTEGER NOT NULL DEFAULT 0,
                last_updated INTEGER NOT NULL
            );",
        )?;
        info!("Store schema initialized");
        Ok(())
    }

    // --- Whitelist ---

    pub fn find_whitelisted(
        &self,
        kind: Kind,
        value: &str,
    ) -> Result<Option<WhitelistEntry>, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, value, reason, added_by, added_at FROM whitelist
             WHERE kind = ?1 AND lower(value) = ?2",
        )?;
        let entry = stmt
            .query_row(params![kind.as_str(), value], |row| {
                Ok(WhitelistEntry {
                    id: row.get(0)?,
                    kind,
                    value: row.get(1)?,
                    reason: row.get(2)?,
                    added_by: row.get(3)?,
                    added_at: row.get(4)?,
                })
            })
            .optional()?;
        Ok(entry)
    }

    /// Administrative insert; advances the whitelist version stamp in the
    /// same transaction. A duplicate (kind, value) maps to `Conflict`.
    pub fn add_whitelisted(
        &self,
        kind: Kind,
        value: &str,
        reason: Option<&str>,
        added_by: Option<&str>,
    ) -> Result<i64, Error> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO whitelist (kind, value, reason, added_by, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            stmt.execute(params![kind.as_str(), value, reason, added_by, unix_now()])
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::Conflict
                    } else {
                        Error::Store(e)
                    }
                })?;
        }
        let id = tx.last_insert_rowid();
        Self::bump_version_on(&tx, data_type(TrackedList::Whitelist, kind))?;
        tx.commit()?;
        Ok(id)
    }

    pub fn list_whitelisted(
        &self,
        kind: Kind,
        since: i64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<WhitelistEntry>, u64), Error> {
        let conn = self.lock();
        let offset = (page.saturating_sub(1) as i64) * per_page as i64;
        let mut stmt = conn.prepare_cached(
            "SELECT id, value, reason, added_by, added_at FROM whitelist
             WHERE kind = ?1 AND added_at > ?2
             ORDER BY added_at ASC LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(params![kind.as_str(), since, per_page as i64, offset], |row| {
                Ok(WhitelistEntry {
                    id: row.get(0)?,
                    kind,
                    value: row.get(1)?,
                    reason: row.get(2)?,
                    added_by: row.get(3)?,
                    added_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = conn
            .prepare_cached("SELECT COUNT(*) FROM whitelist WHERE kind = ?1 AND added_at > ?2")?
            .query_row(params![kind.as_str(), since], |r| r.get(0))?;
        Ok((items, total as u64))
    }

    // --- Blocklist ---

    fn block_from_row(kind: Kind, row: &Row<'_>) -> rusqlite::Result<BlockEntry> {
        let status: String = row.get(5)?;
        Ok(BlockEntry {
            id: row.get(0)?,
            kind,
            value: row.get(1)?,
            reason: row.get(2)?,
            source: row.get(3)?,
            added_at: row.get(4)?,
            status: EntryStatus::parse(&status),
        })
    }

    pub fn find_active_block(&self, kind: Kind, value: &str) -> Result<Option<BlockEntry>, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, value, reason, source, added_at, status FROM blocklist
             WHERE kind = ?1 AND value = ?2 AND status = 'active'",
        )?;
        let entry = stmt
            .query_row(params![kind.as_str(), value], |row| {
                Self::block_from_row(kind, row)
            })
            .optional()?;
        Ok(entry)
    }

    pub fn find_block(&self, kind: Kind, value: &str) -> Result<Option<BlockEntry>, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, value, reason, source, added_at, status FROM blocklist
             WHERE kind = ?1 AND value = ?2",
        )?;
        let entry = stmt
            .query_row(params![kind.as_str(), value], |row| {
                Self::block_from_row(kind, row)
            })
            .optional()?;
        Ok(entry)
    }

    /// Returns the stored rows whose values appear in `values`. The caller
    /// bounds `values` to one chunk; the query predicate grows with it.
    pub fn existing_block_values(
        &self,
        kind: Kind,
        values: &[String],
    ) -> Result<Vec<ExistingBlock>, Error> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let placeholders = vec!["?"; values.len()].join(",");
        let sql = format!(
            "SELECT id, value, status, source FROM blocklist
             WHERE kind = ? AND value IN ({placeholders})"
        );
        let mut stmt = conn.prepare(&sql)?;
        let params_iter =
            std::iter::once(kind.as_str().to_string()).chain(values.iter().cloned());
        let rows = stmt
            .query_map(params_from_iter(params_iter), |row| {
                let status: String = row.get(2)?;
                Ok(ExistingBlock {
                    id: row.get(0)?,
                    value: row.get(1)?,
                    status: EntryStatus::parse(&status),
                    source: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Inserts a batch of active block entries inside one transaction.
    /// Any uniqueness violation rolls the whole batch back as `Conflict`;
    /// the caller retries members individually.
    pub fn insert_block_batch(&self, kind: Kind, entries: &[NewBlockEntry]) -> Result<(), Error> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let now = unix_now();
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO blocklist (kind, value, reason, source, status, added_at)
                 VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
            )?;
            for entry in entries {
                stmt.execute(params![
                    kind.as_str(),
                    entry.value,
                    entry.reason,
                    entry.source,
                    now
                ])
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        Error::Conflict
                    } else {
                        Error::Store(e)
                    }
                })?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Single-row insert; returns `false` when the row already exists.
    pub fn insert_block_single(&self, kind: Kind, entry: &NewBlockEntry) -> Result<bool, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO blocklist (kind, value, reason, source, status, added_at)
             VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
        )?;
        match stmt.execute(params![
            kind.as_str(),
            entry.value,
            entry.reason,
            entry.source,
            unix_now()
        ]) {
            Ok(_) => Ok(true),
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(Error::Store(e)),
        }
    }

    /// Re-ingestion of a known inactive value: back to active, provenance
    /// merged by the caller.
    pub fn reactivate_block(&self, id: i64, source: &str) -> Result<(), Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "UPDATE blocklist SET status = 'active', source = ?2 WHERE id = ?1",
        )?;
        stmt.execute(params![id, source])?;
        Ok(())
    }

    /// Moderation/status transition; returns `false` when no row matched.
    pub fn set_block_status(
        &self,
        kind: Kind,
        value: &str,
        status: EntryStatus,
    ) -> Result<bool, Error> {
        let conn = self.lock();
        let mut stmt = conn
            .prepare_cached("UPDATE blocklist SET status = ?3 WHERE kind = ?1 AND value = ?2")?;
        let changed = stmt.execute(params![kind.as_str(), value, status.as_str()])?;
        Ok(changed > 0)
    }

    pub fn list_active_blocks(
        &self,
        kind: Kind,
        since: i64,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<BlockEntry>, u64), Error> {
        let conn = self.lock();
        let offset = (page.saturating_sub(1) as i64) * per_page as i64;
        let mut stmt = conn.prepare_cached(
            "SELECT id, value, reason, source, added_at, status FROM blocklist
             WHERE kind = ?1 AND status = 'active' AND added_at > ?2
             ORDER BY added_at ASC LIMIT ?3 OFFSET ?4",
        )?;
        let items = stmt
            .query_map(params![kind.as_str(), since, per_page as i64, offset], |row| {
                Self::block_from_row(kind, row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let total: i64 = conn
            .prepare_cached(
                "SELECT COUNT(*) FROM blocklist
                 WHERE kind = ?1 AND status = 'active' AND added_at > ?2",
            )?
            .query_row(params![kind.as_str(), since], |r| r.get(0))?;
        Ok((items, total as u64))
    }

    // --- Duplicate repair ---

    /// Values of `kind` stored in more than one row. Only meaningful on
    /// databases predating the uniqueness index.
    pub fn duplicated_block_values(&self, kind: Kind) -> Result<Vec<String>, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT value FROM blocklist WHERE kind = ?1
             GROUP BY value HAVING COUNT(*) > 1",
        )?;
        let values = stmt
            .query_map(params![kind.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// Deletes every row but the lowest-id one for each of `values`, in a
    /// single transaction. Returns the number of rows deleted.
    pub fn prune_duplicate_blocks(&self, kind: Kind, values: &[String]) -> Result<usize, Error> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let mut deleted = 0usize;
        {
            let mut stmt = tx.prepare_cached(
                "DELETE FROM blocklist WHERE kind = ?1 AND value = ?2
                 AND id > (SELECT MIN(id) FROM blocklist WHERE kind = ?1 AND value = ?2)",
            )?;
            for value in values {
                deleted += stmt.execute(params![kind.as_str(), value])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    // --- Reports ---

    pub fn has_pending_report(&self, kind: Kind, value: &str) -> Result<bool, Error> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT 1 FROM reports WHERE kind = ?1 AND value = ?2 AND status = 'pending'",
        )?;
        let found = stmt
            .query_row(params![kind.as_str(), value], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts a pending report. A concurrent duplicate trips the partial
    /// unique index and maps to `Conflict`.
    pub fn insert_report(
        &self,
        kind: Kind,
        value: &str,
        reason: Option<&str>,
        source: Option<&str>,
    ) -> Result<Report, Error> {
        let conn = self.lock();
        let now = unix_now();
        let mut stmt = conn.prepare_cached(
            "INSERT INTO reports (kind, value, reason, source, status, reported_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
        )?;
        stmt.execute(params![kind.as_str(), value, reason, source, now])
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Conflict
                } else {
                    Error::Store(e)
                }
            })?;
        Ok(Report {
            id: conn.last_insert_rowid(),
            kind,
            value: value.to_string(),
            reason: reason.map(str::to_owned),
            source: source.map(str::to_owned),
            status: ReportStatus::Pending,
            reported_at: now,
        })
    }

    // --- Version stamps ---

    pub fn bump_version(&self, data_type: &str) -> Result<i64, Error> {
        let conn = self.lock();
        Ok(Self::bump_version_on(&conn, data_type)?)
    }

    fn bump_version_on(conn: &Connection, data_type: &str) -> rusqlite::Result<i64> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO data_version (data_type, version, last_updated) VALUES (?1, 1, ?2)
             ON CONFLICT(data_type) DO UPDATE SET
                 version = version + 1,
                 last_updated = excluded.last_updated",
        )?;
        stmt.execute(params![data_type, unix_now()])?;
        conn.prepare_cached("SELECT version FROM data_version WHERE data_type = ?1")?
            .query_row(params![data_type], |r| r.get(0))
    }

    pub fn current_version(&self, data_type: &str) -> Result<i64, Error> {
        let conn = self.lock();
        let version = conn
            .prepare_cached("SELECT version FROM data_version WHERE data_type = ?1")?
            .query_row(params![data_type], |r| r.get::<_, i64>(0))
            .optional()?;
        Ok(version.unwrap_or(0))
    }
}
