//! Per-account history store.
//!
//! One SQLite database per account identity, holding a single append-only
//! table of delivered task ids. Isolation is physical: one account's records
//! can never suppress another account's work.
//!
//! Failure policy:
//! - reads (`exists`, `list_all`) fail open — an I/O error is logged and
//!   treated as "record absent", so the worst case is repeating a task;
//! - writes (`insert`) fail closed — the error propagates and ends up in the
//!   run summary, because a silently lost write is unrecoverable.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use tracing::{debug, error};

use crate::domain::FukuError;

const TABLE: &str = "history";

/// Handle to one account's history database.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    /// Open (creating parent directories and schema as needed).
    pub fn open(path: &Path) -> Result<Self, FukuError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// In-memory store for tests and dry runs.
    pub fn open_in_memory() -> Result<Self, FukuError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Idempotent; safe to call every run.
    pub fn ensure_schema(&self) -> Result<(), FukuError> {
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {TABLE} (
                    id TEXT PRIMARY KEY,
                    type TEXT NOT NULL,
                    timestamp DATETIME DEFAULT CURRENT_TIMESTAMP
                )"
            ),
            [],
        )?;
        Ok(())
    }

    /// True iff a record with this id exists. "Not found" is the false case,
    /// never an error; real I/O errors are logged and read as absent.
    pub fn exists(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let query = format!("SELECT EXISTS(SELECT 1 FROM {TABLE} WHERE id = ?1 LIMIT 1)");
        match self
            .conn
            .query_row(&query, params![id], |row| row.get::<_, i64>(0))
        {
            Ok(n) => n != 0,
            Err(e) => {
                error!(id, error = %e, "history read failed, treating as absent");
                false
            }
        }
    }

    /// Insert-or-ignore: re-inserting a delivered id is a silent no-op, so
    /// retries and out-of-order completion never crash the scheduler.
    pub fn insert(&self, id: &str, kind: &str) -> Result<(), FukuError> {
        if id.is_empty() {
            return Ok(());
        }
        self.conn.execute(
            &format!("INSERT OR IGNORE INTO {TABLE} (id, type) VALUES (?1, ?2)"),
            params![id, kind],
        )?;
        debug!(id, kind, "history record written");
        Ok(())
    }

    /// Bulk fetch of every known id, used once per run at backlog build time
    /// instead of one `exists` round-trip per catalog entry.
    pub fn list_all(&self) -> HashSet<String> {
        let query = format!("SELECT id FROM {TABLE}");
        let mut stmt = match self.conn.prepare(&query) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!(error = %e, "history bulk read failed, treating as empty");
                return HashSet::new();
            }
        };
        match stmt.query_map([], |row| row.get::<_, String>(0)) {
            Ok(rows) => rows.filter_map(Result::ok).collect(),
            Err(e) => {
                error!(error = %e, "history bulk read failed, treating as empty");
                HashSet::new()
            }
        }
    }
}

/// Database path for one account identity.
pub fn store_path_for(dir: &Path, remark: &str) -> PathBuf {
    let safe: String = remark
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    dir.join(format!("{safe}.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_exists() {
        let store = HistoryStore::open_in_memory().expect("open");
        assert!(!store.exists("123"));
        store.insert("123", "dynamic").expect("insert");
        assert!(store.exists("123"));
    }

    #[test]
    fn double_insert_is_a_silent_noop() {
        let store = HistoryStore::open_in_memory().expect("open");
        store.insert("123", "dynamic").expect("first insert");
        store.insert("123", "dynamic").expect("second insert must not error");
        assert!(store.exists("123"));
        assert_eq!(store.list_all().len(), 1);
    }

    #[test]
    fn list_all_returns_every_inserted_id() {
        let store = HistoryStore::open_in_memory().expect("open");
        store.insert("a", "dynamic").expect("insert");
        store.insert("b", "video").expect("insert");
        let all = store.list_all();
        assert_eq!(all.len(), 2);
        assert!(all.contains("a"));
        assert!(all.contains("b"));
    }

    #[test]
    fn ensure_schema_is_idempotent() {
        let store = HistoryStore::open_in_memory().expect("open");
        store.ensure_schema().expect("second ensure_schema");
        store.insert("x", "dynamic").expect("insert");
        store.ensure_schema().expect("third ensure_schema");
        assert!(store.exists("x"), "existing records survive re-ensure");
    }

    #[test]
    fn empty_id_is_ignored() {
        let store = HistoryStore::open_in_memory().expect("open");
        store.insert("", "dynamic").expect("no-op insert");
        assert!(!store.exists(""));
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn store_path_sanitizes_the_remark() {
        let path = store_path_for(Path::new("data/db"), "메인/alt 账号");
        let name = path.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.ends_with(".db"));
        assert!(!name.contains('/'));
        assert!(!name.contains(' '));
    }
}
