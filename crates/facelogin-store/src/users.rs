//! Enrolled users: one descriptor per username.

use crate::error::{Result, StoreError};
use crate::Store;
use facelogin_core::{Descriptor, EnrolledFace};
use rusqlite::{params, ErrorCode};

/// Check that `username` is usable as a key and as a stored-file prefix.
///
/// Names must be non-empty and free of path separators, `..` and NUL.
pub fn check_username(username: &str) -> Result<()> {
    let unsafe_name = username.is_empty()
        || username.contains(['/', '\\', '\0'])
        || username.contains("..");
    if unsafe_name {
        return Err(StoreError::InvalidUsername(username.to_string()));
    }
    Ok(())
}

impl Store {
    /// Persist a new user. Fails with [`StoreError::DuplicateUsername`] if the
    /// name is taken; the existing row is left untouched.
    pub fn insert_user(&self, username: &str, descriptor: &Descriptor) -> Result<()> {
        check_username(username)?;
        self.with_connection(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, encoding) VALUES (?1, ?2)",
                params![username, descriptor.to_bytes()],
            );
            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    Err(StoreError::DuplicateUsername(username.to_string()))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Every enrolled face in insertion order.
    ///
    /// Rows whose blob is not a valid descriptor are skipped with a warning.
    pub fn list_enrolled(&self) -> Result<Vec<EnrolledFace>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT username, encoding FROM users ORDER BY id")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?;

            let mut gallery = Vec::new();
            for row in rows {
                let (username, blob) = row?;
                match Descriptor::from_bytes(&blob) {
                    Ok(descriptor) => gallery.push(EnrolledFace { username, descriptor }),
                    Err(e) => tracing::warn!(user = %username, error = %e, "skipping unreadable descriptor"),
                }
            }
            Ok(gallery)
        })
    }

    pub fn list_usernames(&self) -> Result<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT username FROM users ORDER BY id")?;
            let names = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
    }

    pub fn count_users(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(n as u64)
        })
    }
}
