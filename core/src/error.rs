//! Crate error type.
//!
//! Only construction-time and storage operations surface errors. Lookups,
//! learning and blacklist maintenance degrade silently (with a log line)
//! instead of failing the caller.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fst error: {0}")]
    Fst(#[from] fst::Error),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("dictionary not found: {}", .0.display())]
    DictionaryNotFound(PathBuf),

    #[error("invalid word: {0:?}")]
    InvalidWord(String),

    #[error("invalid dictionary data: {0}")]
    InvalidData(String),
}

impl From<redb::DatabaseError> for SuggestError {
    fn from(e: redb::DatabaseError) -> Self {
        SuggestError::Storage(e.into())
    }
}

impl From<redb::TransactionError> for SuggestError {
    fn from(e: redb::TransactionError) -> Self {
        SuggestError::Storage(e.into())
    }
}

impl From<redb::TableError> for SuggestError {
    fn from(e: redb::TableError) -> Self {
        SuggestError::Storage(e.into())
    }
}

impl From<redb::StorageError> for SuggestError {
    fn from(e: redb::StorageError) -> Self {
        SuggestError::Storage(e.into())
    }
}

impl From<redb::CommitError> for SuggestError {
    fn from(e: redb::CommitError) -> Self {
        SuggestError::Storage(e.into())
    }
}

pub type Result<T> = std::result::Result<T, SuggestError>;
