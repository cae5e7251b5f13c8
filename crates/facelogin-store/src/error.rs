use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("file missing on disk: {0}")]
    FileMissing(String),
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
