//! facelogin-store: SQLite record store and upload directory.
//!
//! Every operation opens its own connection and runs as a single implicit
//! transaction; the connection is closed when the operation returns, on the
//! error path as well.

pub mod error;
pub mod files;
pub mod uploads;
pub mod users;

use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub use error::{Result, StoreError};
pub use files::FileRecord;
pub use uploads::UploadDir;
pub use users::check_username;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        encoding BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS files (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL,
        file_name   TEXT NOT NULL,
        file_path   TEXT NOT NULL,
        upload_time TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (username) REFERENCES users(username)
    );
    CREATE INDEX IF NOT EXISTS files_username ON files(username);
";

/// Handle on the database file. Cheap to clone; holds no open connection.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (creating if needed) the database at `db_path` and apply the schema.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { db_path };
        store.with_connection(|conn| Ok(conn.execute_batch(SCHEMA)?))?;
        tracing::info!(path = %store.db_path.display(), "record store ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run one unit of work on a fresh connection.
    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = Connection::open(&self.db_path)?;
        f(&conn)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Store;
    use tempfile::TempDir;

    pub fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("users.db")).unwrap();
        (dir, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/users.db");
        let store = Store::open(&path).unwrap();
        assert!(path.exists());

        let tables: Vec<String> = store
            .with_connection(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'files') ORDER BY name",
                )?;
                let names = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<_>>()?;
                Ok(names)
            })
            .unwrap();
        assert_eq!(tables, vec!["files", "users"]);
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        Store::open(&path).unwrap();
        Store::open(&path).unwrap();
    }
}
