//! Observability subsystem for markdb
//!
//! Structured, synchronous JSON logging of typed retrieval events.
//!
//! ```ignore
//! use markdb::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::StreamBegin, &[("store", "bookmarks")]);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
