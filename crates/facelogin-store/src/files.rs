//! Upload metadata rows.

use crate::error::Result;
use crate::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    pub id: i64,
    pub username: String,
    /// Name the file was uploaded under.
    pub file_name: String,
    /// Where the stored copy lives on disk.
    pub file_path: PathBuf,
    pub upload_time: DateTime<Utc>,
}

impl FileRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            file_name: row.get(2)?,
            file_path: PathBuf::from(row.get::<_, String>(3)?),
            upload_time: row.get(4)?,
        })
    }

    /// Final path component of the stored copy, used in download/preview links.
    pub fn stored_name(&self) -> Option<&str> {
        self.file_path.file_name().and_then(|n| n.to_str())
    }
}

const FILE_COLUMNS: &str = "id, username, file_name, file_path, upload_time";

impl Store {
    pub fn insert_file(&self, username: &str, file_name: &str, file_path: &Path) -> Result<FileRecord> {
        let upload_time = Utc::now();
        let path = file_path.to_string_lossy().into_owned();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO files (username, file_name, file_path, upload_time) VALUES (?1, ?2, ?3, ?4)",
                params![username, file_name, path, upload_time],
            )?;
            Ok(FileRecord {
                id: conn.last_insert_rowid(),
                username: username.to_string(),
                file_name: file_name.to_string(),
                file_path: file_path.to_path_buf(),
                upload_time,
            })
        })
    }

    /// All files owned by `username`, oldest first.
    pub fn list_files(&self, username: &str) -> Result<Vec<FileRecord>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE username = ?1 ORDER BY id"
            ))?;
            let files = stmt
                .query_map(params![username], FileRecord::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(files)
        })
    }

    /// Look up a file by id, scoped to its owner.
    pub fn get_file(&self, id: i64, username: &str) -> Result<Option<FileRecord>> {
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?1 AND username = ?2"),
                    params![id, username],
                    FileRecord::from_row,
                )
                .optional()?)
        })
    }

    /// Remove a file row. Returns whether a row was deleted.
    pub fn delete_file(&self, id: i64, username: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let affected = conn.execute(
                "DELETE FROM files WHERE id = ?1 AND username = ?2",
                params![id, username],
            )?;
            Ok(affected > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::temp_store;
    use std::path::Path;

    #[test]
    fn test_insert_and_list_per_user() {
        let (_dir, store) = temp_store();
        let a = store.insert_file("alice", "notes.txt", Path::new("up/alice1notes.txt")).unwrap();
        store.insert_file("bob", "cat.png", Path::new("up/bob2cat.png")).unwrap();
        let b = store.insert_file("alice", "cv.pdf", Path::new("up/alice3cv.pdf")).unwrap();
        assert!(b.id > a.id);

        let files = store.list_files("alice").unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].file_name, "notes.txt");
        assert_eq!(files[1].file_path, Path::new("up/alice3cv.pdf"));
        assert_eq!(files[1].stored_name(), Some("alice3cv.pdf"));

        assert!(store.list_files("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_get_file_is_scoped_to_owner() {
        let (_dir, store) = temp_store();
        let rec = store.insert_file("alice", "a.txt", Path::new("up/a.txt")).unwrap();
        let found = store.get_file(rec.id, "alice").unwrap().unwrap();
        assert_eq!((found.id, found.file_name.as_str()), (rec.id, "a.txt"));
        assert_eq!(store.get_file(rec.id, "mallory").unwrap(), None);
    }

    #[test]
    fn test_delete_file() {
        let (_dir, store) = temp_store();
        let rec = store.insert_file("alice", "a.txt", Path::new("up/a.txt")).unwrap();
        assert!(!store.delete_file(rec.id, "mallory").unwrap());
        assert!(store.delete_file(rec.id, "alice").unwrap());
        assert!(!store.delete_file(rec.id, "alice").unwrap());
        assert!(store.list_files("alice").unwrap().is_empty());
    }
}
