//! Per-user file uploads: metadata in the store, contents in the upload directory.

use facelogin_store::{FileRecord, Store, StoreError, UploadDir};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("username is empty or contains path characters")]
    InvalidUsername,
    #[error("file not found or access denied")]
    FileNotFound,
    #[error("file not found")]
    FileMissing,
    #[error("store: {0}")]
    Store(StoreError),
}

impl From<StoreError> for FileError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::FileMissing(_) => FileError::FileMissing,
            StoreError::InvalidUsername(_) => FileError::InvalidUsername,
            other => FileError::Store(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileManager {
    store: Store,
    uploads: UploadDir,
}

impl FileManager {
    pub fn new(store: Store, uploads: UploadDir) -> Self {
        Self { store, uploads }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Store an uploaded file for `username` and record it.
    pub fn upload(&self, username: &str, file_name: &str, contents: &[u8]) -> Result<FileRecord, FileError> {
        if file_name.is_empty() {
            return Err(FileError::NoFileSelected);
        }
        let path = self.uploads.save(username, file_name, contents)?;
        let record = match self.store.insert_file(username, file_name, &path) {
            Ok(record) => record,
            Err(e) => {
                if let Err(cleanup) = UploadDir::remove(&path) {
                    tracing::warn!(
                        path = %path.display(),
                        error = %cleanup,
                        "removing orphaned upload failed"
                    );
                }
                return Err(e.into());
            }
        };
        tracing::info!(user = username, id = record.id, file = file_name, "file uploaded");
        Ok(record)
    }

    /// Files owned by `username`.
    pub fn list(&self, username: &str) -> Result<Vec<FileRecord>, FileError> {
        Ok(self.store.list_files(username)?)
    }

    /// Delete a file owned by `username`.
    ///
    /// The row must exist for this owner. Its file on disk is removed if still
    /// present; a file that already vanished does not fail the delete.
    pub fn delete(&self, id: i64, username: &str) -> Result<FileRecord, FileError> {
        let record = self.store.get_file(id, username)?.ok_or(FileError::FileNotFound)?;
        if !UploadDir::remove(&record.file_path)? {
            tracing::warn!(id, path = %record.file_path.display(), "file already missing on disk");
        }
        self.store.delete_file(id, username)?;
        tracing::info!(user = username, id, "file deleted");
        Ok(record)
    }

    /// Path of a stored file, by stored name.
    pub fn resolve(&self, stored_name: &str) -> Result<PathBuf, FileError> {
        Ok(self.uploads.resolve(stored_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager() -> (TempDir, FileManager) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("users.db")).unwrap();
        let uploads = UploadDir::open(dir.path().join("uploaded_files")).unwrap();
        (dir, FileManager::new(store, uploads))
    }

    #[test]
    fn test_upload_list_resolve() {
        let (_dir, files) = manager();
        let rec = files.upload("alice", "notes.txt", b"hello").unwrap();
        assert_eq!(rec.file_name, "notes.txt");

        let listed = files.list("alice").unwrap();
        assert_eq!(listed.len(), 1);
        let path = files.resolve(rec.stored_name().unwrap()).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"hello");
    }

    #[test]
    fn test_upload_without_name() {
        let (_dir, files) = manager();
        assert!(matches!(files.upload("alice", "", b"x"), Err(FileError::NoFileSelected)));
        assert!(files.list("alice").unwrap().is_empty());
    }

    #[test]
    fn test_upload_rejects_path_like_username() {
        let (dir, files) = manager();
        for name in ["../x", "/tmp/x"] {
            assert!(matches!(files.upload(name, "a.txt", b"x"), Err(FileError::InvalidUsername)), "{name}");
        }
        assert_eq!(std::fs::read_dir(dir.path().join("uploaded_files")).unwrap().count(), 0);
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn test_failed_insert_removes_written_file() {
        let (dir, files) = manager();
        // A directory where the database file was makes every connection fail.
        let db_path = files.store().path().to_path_buf();
        std::fs::remove_file(&db_path).unwrap();
        std::fs::create_dir(&db_path).unwrap();

        assert!(matches!(files.upload("alice", "a.txt", b"x"), Err(FileError::Store(_))));
        assert_eq!(std::fs::read_dir(dir.path().join("uploaded_files")).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_removes_file_and_row() {
        let (_dir, files) = manager();
        let rec = files.upload("alice", "a.txt", b"x").unwrap();
        files.delete(rec.id, "alice").unwrap();
        assert!(!rec.file_path.exists());
        assert!(files.list("alice").unwrap().is_empty());
    }

    #[test]
    fn test_delete_succeeds_when_file_already_gone() {
        let (_dir, files) = manager();
        let rec = files.upload("alice", "a.txt", b"x").unwrap();
        std::fs::remove_file(&rec.file_path).unwrap();

        files.delete(rec.id, "alice").unwrap();
        assert!(files.list("alice").unwrap().is_empty());
    }

    #[test]
    fn test_delete_other_users_file_is_denied() {
        let (_dir, files) = manager();
        let rec = files.upload("alice", "a.txt", b"x").unwrap();
        assert!(matches!(files.delete(rec.id, "mallory"), Err(FileError::FileNotFound)));
        assert!(rec.file_path.exists());
        assert_eq!(files.list("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_resolve_missing() {
        let (_dir, files) = manager();
        assert!(matches!(files.resolve("nope.txt"), Err(FileError::FileMissing)));
    }
}
