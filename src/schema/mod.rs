//! Store schema descriptions for markdb
//!
//! Schemas are created once at startup and shared process-wide. They describe
//! which stores exist and which secondary indexes each store declares; the
//! retrieval layer consults them to decide what can be pushed to storage.

mod index_schema;

pub use index_schema::IndexSchema;
