//! Retrieval error types
//!
//! Error codes:
//! - MARK_QUERY_INVALID (REJECT)
//! - MARK_QUERY_SORT_NOT_INDEXED (REJECT)
//! - MARK_QUERY_PAGE_SIZE_INVALID (REJECT)
//! - MARK_EXTRACTION_FAILED (ERROR)
//! - MARK_STORAGE_FAILED (ERROR)
//!
//! REJECT errors are raised while resolving a query, before any storage
//! access. ERROR errors surface while a fetch is being consumed.

use std::fmt;

use crate::storage::StorageError;

/// Severity levels for retrieval errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller or configuration error; nothing was read
    Reject,
    /// Failure while reading
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Retrieval error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrieveErrorCode {
    /// Malformed query
    MarkQueryInvalid,
    /// Sort target has no backing index
    MarkQuerySortNotIndexed,
    /// Page size must be positive
    MarkQueryPageSizeInvalid,
    /// Stored entry could not be turned into a record
    MarkExtractionFailed,
    /// Storage collaborator failed
    MarkStorageFailed,
}

impl RetrieveErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            RetrieveErrorCode::MarkQueryInvalid => "MARK_QUERY_INVALID",
            RetrieveErrorCode::MarkQuerySortNotIndexed => "MARK_QUERY_SORT_NOT_INDEXED",
            RetrieveErrorCode::MarkQueryPageSizeInvalid => "MARK_QUERY_PAGE_SIZE_INVALID",
            RetrieveErrorCode::MarkExtractionFailed => "MARK_EXTRACTION_FAILED",
            RetrieveErrorCode::MarkStorageFailed => "MARK_STORAGE_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            RetrieveErrorCode::MarkQueryInvalid
            | RetrieveErrorCode::MarkQuerySortNotIndexed
            | RetrieveErrorCode::MarkQueryPageSizeInvalid => Severity::Reject,
            RetrieveErrorCode::MarkExtractionFailed | RetrieveErrorCode::MarkStorageFailed => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for RetrieveErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Retrieval error with full context
#[derive(Debug, Clone)]
pub struct RetrieveError {
    /// Error code
    code: RetrieveErrorCode,
    /// Human-readable message
    message: String,
    /// Field or index name if applicable
    field: Option<String>,
    /// Underlying storage failure
    source: Option<StorageError>,
}

impl RetrieveError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: RetrieveErrorCode::MarkQueryInvalid,
            message: reason.into(),
            field: None,
            source: None,
        }
    }

    /// Create a sort not indexed error
    pub fn sort_not_indexed(store: &str, index: Option<&str>) -> Self {
        let message = match index {
            Some(name) => format!("Sort index '{}' is not declared on store '{}'", name, store),
            None => format!("Sort target on store '{}' has no backing index", store),
        };
        Self {
            code: RetrieveErrorCode::MarkQuerySortNotIndexed,
            message,
            field: index.map(str::to_string),
            source: None,
        }
    }

    /// Create a page size error
    pub fn page_size_invalid(page_size: usize) -> Self {
        Self {
            code: RetrieveErrorCode::MarkQueryPageSizeInvalid,
            message: format!("Page size must be > 0, got {}", page_size),
            field: None,
            source: None,
        }
    }

    /// Create an extraction error
    pub fn extraction_failed(reason: impl Into<String>) -> Self {
        Self {
            code: RetrieveErrorCode::MarkExtractionFailed,
            message: reason.into(),
            field: None,
            source: None,
        }
    }

    /// Create a storage error
    pub fn storage(err: StorageError) -> Self {
        Self {
            code: RetrieveErrorCode::MarkStorageFailed,
            message: err.to_string(),
            field: None,
            source: Some(err),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> RetrieveErrorCode {
        self.code
    }

    /// Returns the severity
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the field if applicable
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns the storage failure this error wraps, if any
    pub fn storage_error(&self) -> Option<&StorageError> {
        self.source.as_ref()
    }

    /// True for errors raised before any storage access
    pub fn is_configuration(&self) -> bool {
        self.severity() == Severity::Reject
    }
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for RetrieveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StorageError> for RetrieveError {
    fn from(err: StorageError) -> Self {
        Self::storage(err)
    }
}

impl From<serde_json::Error> for RetrieveError {
    fn from(err: serde_json::Error) -> Self {
        Self::extraction_failed(err.to_string())
    }
}

/// Result type for retrieval operations
pub type RetrieveResult<T> = Result<T, RetrieveError>;
