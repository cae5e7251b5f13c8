//! Upload directory on disk.

use crate::error::{Result, StoreError};
use crate::users::check_username;
use rand::Rng;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Exclusive upper bound of the random suffix mixed into stored names.
const SUFFIX_RANGE: u32 = 100_000;

/// Directory holding uploaded file contents.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Use `root` as the upload directory, creating it if missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored name for an upload: `<username><random suffix><original basename>`.
    ///
    /// The suffix only makes collisions unlikely; they are not detected.
    pub fn stored_name(username: &str, original: &str) -> String {
        let suffix = rand::thread_rng().gen_range(0..SUFFIX_RANGE);
        format!("{username}{suffix}{}", basename(original))
    }

    /// Write `contents` under a freshly generated stored name and return its path.
    ///
    /// Fails with [`StoreError::InvalidUsername`] unless the result lands
    /// directly inside the upload directory.
    pub fn save(&self, username: &str, original: &str, contents: &[u8]) -> Result<PathBuf> {
        check_username(username)?;
        let path = self.root.join(Self::stored_name(username, original));
        if path.parent() != Some(self.root.as_path()) {
            return Err(StoreError::InvalidUsername(username.to_string()));
        }
        std::fs::write(&path, contents)?;
        tracing::debug!(path = %path.display(), bytes = contents.len(), "stored upload");
        Ok(path)
    }

    /// Resolve a requested stored name to a file inside the upload directory.
    ///
    /// Directory components in `name` are discarded.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let file = basename(name);
        let path = self.root.join(file);
        if file.is_empty() || !path.is_file() {
            return Err(StoreError::FileMissing(file.to_string()));
        }
        Ok(path)
    }

    /// Remove a stored file. A file that is already gone is not an error;
    /// returns whether anything was removed.
    pub fn remove(path: &Path) -> Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "upload already removed from disk");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Last path component of `name`, accepting either separator.
fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
