//! Storage collaborator traits
//!
//! The retrieval layer talks to the store only through these traits: it opens
//! scoped transactions and, inside them, runs cursor scans with an offset,
//! get-all scans, and point get/put/delete.

use serde_json::Value;

use super::errors::StorageResult;
use super::key::{Direction, IndexValue, KeyRange};

/// What a scan runs over: a store's primary key order, or one of its indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSource<'a> {
    pub store: &'a str,
    pub index: Option<&'a str>,
}

impl<'a> ScanSource<'a> {
    /// Scan a store in primary key order
    pub fn store(store: &'a str) -> Self {
        Self { store, index: None }
    }

    /// Scan a store through one of its indexes
    pub fn index(store: &'a str, index: &'a str) -> Self {
        Self {
            store,
            index: Some(index),
        }
    }

    /// Scan through the index if one is given, the store otherwise
    pub fn new(store: &'a str, index: Option<&'a str>) -> Self {
        Self { store, index }
    }
}

/// A transactional store that can open scoped transactions.
#[allow(async_fn_in_trait)]
pub trait Database {
    type Transaction: Transaction;

    /// Opens a read-only transaction over the given stores
    async fn transaction(&self, stores: &[&str]) -> StorageResult<Self::Transaction>;

    /// Opens a read-write transaction over the given stores
    async fn write_transaction(&self, stores: &[&str]) -> StorageResult<Self::Transaction>;
}

/// Operations available inside a transaction.
///
/// Index scans order entries by (index key, primary key); `Direction::Prev`
/// reverses both.
#[allow(async_fn_in_trait)]
pub trait Transaction {
    /// Opens a cursor over `source`, skips `advance` entries, and reads up to `take`.
    async fn open_cursor(
        &self,
        source: ScanSource<'_>,
        key: Option<&KeyRange>,
        direction: Direction,
        advance: usize,
        take: usize,
    ) -> StorageResult<Vec<Value>>;

    /// Reads every entry of `source` within `key`, in ascending order.
    async fn get_all(
        &self,
        source: ScanSource<'_>,
        key: Option<&KeyRange>,
    ) -> StorageResult<Vec<Value>>;

    /// Reads a record by primary key
    async fn get(&self, store: &str, key: &IndexValue) -> StorageResult<Option<Value>>;

    /// Inserts or fully replaces a record
    async fn put(&mut self, store: &str, value: Value) -> StorageResult<()>;

    /// Deletes a record by primary key. Missing records are ignored.
    async fn delete(&mut self, store: &str, key: &IndexValue) -> StorageResult<()>;

    /// Commits the transaction. Dropping without commit discards writes.
    async fn commit(self) -> StorageResult<()>;
}
