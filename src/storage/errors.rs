//! Storage error types
//!
//! Error codes:
//! - MARK_STORAGE_UNKNOWN_STORE
//! - MARK_STORAGE_UNKNOWN_INDEX
//! - MARK_STORAGE_NOT_IN_SCOPE
//! - MARK_STORAGE_READ_ONLY
//! - MARK_STORAGE_INVALID_KEY
//! - MARK_STORAGE_UNAVAILABLE
//! - MARK_STORAGE_SERIALIZATION

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by the storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Store is not defined in the database
    #[error("Unknown store: {0}")]
    UnknownStore(String),

    /// Index is not declared on the store
    #[error("Unknown index '{index}' on store '{store}'")]
    UnknownIndex { store: String, index: String },

    /// Store was not declared when the transaction was opened
    #[error("Store '{0}' is not part of this transaction's scope")]
    NotInScope(String),

    /// Write attempted inside a read-only transaction
    #[error("Transaction is read-only")]
    ReadOnly,

    /// Record has no valid primary key
    #[error("Record in store '{0}' has no valid primary key")]
    InvalidKey(String),

    /// Database cannot open transactions
    #[error("Database unavailable: {0}")]
    Unavailable(String),

    /// Stored value could not be encoded or decoded
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StorageError::UnknownStore(_) => "MARK_STORAGE_UNKNOWN_STORE",
            StorageError::UnknownIndex { .. } => "MARK_STORAGE_UNKNOWN_INDEX",
            StorageError::NotInScope(_) => "MARK_STORAGE_NOT_IN_SCOPE",
            StorageError::ReadOnly => "MARK_STORAGE_READ_ONLY",
            StorageError::InvalidKey(_) => "MARK_STORAGE_INVALID_KEY",
            StorageError::Unavailable(_) => "MARK_STORAGE_UNAVAILABLE",
            StorageError::Serialization(_) => "MARK_STORAGE_SERIALIZATION",
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StorageError::UnknownStore("x".into()).code(),
            "MARK_STORAGE_UNKNOWN_STORE"
        );
        assert_eq!(StorageError::ReadOnly.code(), "MARK_STORAGE_READ_ONLY");
        assert_eq!(
            StorageError::Unavailable("closed".into()).code(),
            "MARK_STORAGE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::UnknownIndex {
            store: "bookmarks".into(),
            index: "deadline".into(),
        };
        let display = err.to_string();
        assert!(display.contains("deadline"));
        assert!(display.contains("bookmarks"));
    }
}
