use crate::error::StoreError;
use crate::schema::MIG_0001_INIT;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Handle to the crawl database. Cloning is cheap; all clones share one
/// connection, so concurrent callers serialize through the inner lock.
#[derive(Clone, Debug)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    /// Open (or create) the database file. Any failure here is fatal:
    /// scanning must not start against an unreachable store.
    pub fn open_or_create(path: impl AsRef<std::path::Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::Unavailable)?;
        apply_pragmas(&conn).map_err(StoreError::Unavailable)?;
        migrate(&conn).map_err(StoreError::Unavailable)?;
        Ok(Db { conn: Arc::new(Mutex::new(conn)) })
    }

    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another caller panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, StoreError> {
        let cnt: i64 = self.conn().query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }
}

fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "journal_mode", &"WAL")?;
    conn.pragma_update(None, "synchronous", &"NORMAL")?;
    conn.pragma_update(None, "foreign_keys", &"ON")?;
    Ok(())
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    // naive: if the relationships table doesn't exist, apply 0001
    let exists: i64 = conn.query_row(
        "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name='relationships'",
        [],
        |r| r.get(0),
    )?;
    if exists == 0 {
        conn.execute_batch(MIG_0001_INIT)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_schema_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open_or_create(dir.path().join("crawl.db")).unwrap();
        assert!(db.table_exists("relationships").unwrap());
        assert!(db.table_exists("crawls").unwrap());
        assert!(!db.table_exists("nope").unwrap());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crawl.db");
        drop(Db::open_or_create(&path).unwrap());
        let db = Db::open_or_create(&path).unwrap();
        assert!(db.table_exists("relationships").unwrap());
    }

    #[test]
    fn unreadable_path_is_unavailable() {
        let err = Db::open_or_create("/definitely/not/a/dir/crawl.db").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }
}
