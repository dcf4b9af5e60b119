//! Storage collaborator for markdb
//!
//! The retrieval engine consumes storage only through the [`Database`] and
//! [`Transaction`] traits. [`MemoryDatabase`] is the in-process implementation.
//!
//! # Key semantics
//!
//! - Keys order as Number < String < Array
//! - Booleans, nulls and objects are not keys; records lacking a valid key for
//!   an index are absent from that index
//! - Index scans order ties by primary key

mod database;
mod errors;
mod key;
mod memory;

pub use database::{Database, ScanSource, Transaction};
pub use errors::{StorageError, StorageResult};
pub use key::{Direction, IndexValue, KeyRange, ToIndexValue};
pub use memory::{MemoryDatabase, MemoryTransaction};
