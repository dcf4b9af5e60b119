//! Store identity: name, primary key fields and declared secondary indexes.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::storage::IndexValue;

/// Static description of a store.
///
/// Two schemas are equal when they describe the same store with the same
/// indices; the primary key set does not take part in equality or hashing.
/// An index name is also the key path of the indexed field.
#[derive(Debug, Clone)]
pub struct IndexSchema {
    store_name: String,
    primary_key: BTreeSet<String>,
    indices: BTreeSet<String>,
}

impl IndexSchema {
    /// Create a new schema
    pub fn new(
        store_name: impl Into<String>,
        primary_key: impl IntoIterator<Item = impl Into<String>>,
        indices: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            store_name: store_name.into(),
            primary_key: primary_key.into_iter().map(Into::into).collect(),
            indices: indices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn primary_key(&self) -> &BTreeSet<String> {
        &self.primary_key
    }

    pub fn indices(&self) -> &BTreeSet<String> {
        &self.indices
    }

    /// Checks if an index is declared on this store
    pub fn has_index(&self, name: &str) -> bool {
        self.indices.contains(name)
    }

    /// Extracts the primary key of a stored record.
    ///
    /// A single key field yields its value; several fields yield a compound
    /// key in field-name order. Returns None if any part is missing or not
    /// a valid key.
    pub fn primary_key_of(&self, record: &Value) -> Option<IndexValue> {
        let mut parts = self
            .primary_key
            .iter()
            .map(|field| record.get(field).and_then(IndexValue::from_json))
            .collect::<Option<Vec<_>>>()?;

        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(IndexValue::Array(parts)),
        }
    }

    /// Extracts the key a record has in the given index, if it is indexed there
    pub fn index_key_of(&self, index: &str, record: &Value) -> Option<IndexValue> {
        if !self.has_index(index) {
            return None;
        }
        record.get(index).and_then(IndexValue::from_json)
    }
}

impl PartialEq for IndexSchema {
    fn eq(&self, other: &Self) -> bool {
        self.store_name == other.store_name && self.indices == other.indices
    }
}

impl Eq for IndexSchema {}

impl Hash for IndexSchema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.store_name.hash(state);
        self.indices.hash(state);
    }
}

impl fmt::Display for IndexSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<&str> = self.indices.iter().map(String::as_str).collect();
        write!(f, "INDEX {}: [{}]", self.store_name, indices.join(", "))
    }
}
