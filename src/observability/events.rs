//! Observable retrieval events
//!
//! Events are explicit and typed; each maps to a stable upper-case name.

use std::fmt;

use super::logger::Severity;

/// Observable events in markdb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Retrieval
    /// Query resolved into a storage query
    QueryResolved,
    /// Query rejected at resolve time
    QueryRejected,
    /// Streaming (paginated) fetch begins
    StreamBegin,
    /// One page read from storage
    PageFetched,
    /// Paginated scan reached the end of its range
    StreamComplete,
    /// Materialized fetch read its full range
    MaterializeComplete,

    // Failures
    /// A stored record could not be extracted
    ExtractionFailed,
    /// Storage layer failed during a fetch
    StorageFailed,

    // Writes
    /// Record written
    WriteCommit,
    /// Record deleted
    DeleteCommit,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::QueryResolved => "QUERY_RESOLVED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::StreamBegin => "STREAM_BEGIN",
            Event::PageFetched => "PAGE_FETCHED",
            Event::StreamComplete => "STREAM_COMPLETE",
            Event::MaterializeComplete => "MATERIALIZE_COMPLETE",

            Event::ExtractionFailed => "EXTRACTION_FAILED",
            Event::StorageFailed => "STORAGE_FAILED",

            Event::WriteCommit => "WRITE_COMMIT",
            Event::DeleteCommit => "DELETE_COMMIT",
        }
    }

    /// Severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::PageFetched | Event::QueryResolved => Severity::Trace,
            Event::QueryRejected | Event::ExtractionFailed => Severity::Warn,
            Event::StorageFailed => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
