//! In-memory transactional store
//!
//! Records live in a BTreeMap keyed by primary key; every declared index maps
//! an index key to the set of primary keys holding it, so iteration order is
//! deterministic and duplicate index keys are ordered by primary key. Scans
//! walk only the requested key range.
//!
//! Read transactions hold a shared lock for their whole lifetime and so see a
//! consistent snapshot. Write transactions hold the exclusive lock, mutate a
//! private copy, and swap it in on commit.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use super::database::{Database, ScanSource, Transaction};
use super::errors::{StorageError, StorageResult};
use super::key::{Direction, IndexValue, KeyRange};
use crate::schema::IndexSchema;

/// One store: records plus their secondary indexes
#[derive(Debug, Clone)]
struct MemoryStore {
    schema: IndexSchema,
    records: BTreeMap<IndexValue, Value>,
    /// index name -> index key -> primary keys
    indexes: HashMap<String, BTreeMap<IndexValue, BTreeSet<IndexValue>>>,
}

type Scan<'s> = Box<dyn Iterator<Item = &'s Value> + 's>;

impl MemoryStore {
    fn new(schema: IndexSchema) -> Self {
        let indexes = schema
            .indices()
            .iter()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();
        Self {
            schema,
            records: BTreeMap::new(),
            indexes,
        }
    }

    fn put(&mut self, value: Value) -> StorageResult<()> {
        let pk = self
            .schema
            .primary_key_of(&value)
            .ok_or_else(|| StorageError::InvalidKey(self.schema.store_name().to_string()))?;

        if let Some(old) = self.records.remove(&pk) {
            self.unindex(&pk, &old);
        }
        self.index(&pk, &value);
        self.records.insert(pk, value);
        Ok(())
    }

    fn delete(&mut self, pk: &IndexValue) {
        if let Some(old) = self.records.remove(pk) {
            self.unindex(pk, &old);
        }
    }

    fn index(&mut self, pk: &IndexValue, value: &Value) {
        for (name, entries) in self.indexes.iter_mut() {
            // Records without a valid key for this index are not part of it
            if let Some(key) = self.schema.index_key_of(name, value) {
                entries.entry(key).or_default().insert(pk.clone());
            }
        }
    }

    fn unindex(&mut self, pk: &IndexValue, value: &Value) {
        for (name, entries) in self.indexes.iter_mut() {
            let Some(key) = self.schema.index_key_of(name, value) else {
                continue;
            };
            if let Some(pks) = entries.get_mut(&key) {
                pks.remove(pk);
                if pks.is_empty() {
                    entries.remove(&key);
                }
            }
        }
    }

    /// Lazily walks matching records in scan order
    fn scan<'s>(
        &'s self,
        index: Option<&str>,
        key: Option<&KeyRange>,
        direction: Direction,
    ) -> StorageResult<Scan<'s>> {
        let entries = match index {
            None => None,
            Some(name) => Some(self.indexes.get(name).ok_or_else(|| {
                StorageError::UnknownIndex {
                    store: self.schema.store_name().to_string(),
                    index: name.to_string(),
                }
            })?),
        };

        let Some(bounds) = range_bounds(key) else {
            return Ok(Box::new(std::iter::empty()));
        };

        Ok(match entries {
            None => directed(self.records.range(bounds).map(|(_, value)| value), direction),
            Some(entries) => directed(
                entries
                    .range(bounds)
                    .flat_map(|(_, pks)| pks.iter())
                    .filter_map(move |pk| self.records.get(pk)),
                direction,
            ),
        })
    }
}

/// BTree bounds of a key range; `None` for a range that holds no key
fn range_bounds(key: Option<&KeyRange>) -> Option<(Bound<&IndexValue>, Bound<&IndexValue>)> {
    match key {
        None => Some((Bound::Unbounded, Bound::Unbounded)),
        Some(KeyRange::Bound { lower, upper }) if lower > upper => None,
        Some(range) => Some((range.lower(), range.upper())),
    }
}

fn directed<'s, I>(iter: I, direction: Direction) -> Scan<'s>
where
    I: DoubleEndedIterator<Item = &'s Value> + 's,
{
    if direction.is_reverse() {
        Box::new(iter.rev())
    } else {
        Box::new(iter)
    }
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    stores: BTreeMap<String, MemoryStore>,
}

/// In-memory implementation of [`Database`].
#[derive(Debug)]
pub struct MemoryDatabase {
    state: Arc<RwLock<MemoryState>>,
    transactions_opened: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryDatabase {
    /// Creates a database with one empty store per schema
    pub fn new(schemas: impl IntoIterator<Item = IndexSchema>) -> Self {
        let stores = schemas
            .into_iter()
            .map(|schema| (schema.store_name().to_string(), MemoryStore::new(schema)))
            .collect();
        Self {
            state: Arc::new(RwLock::new(MemoryState { stores })),
            transactions_opened: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Number of transactions opened so far (read and write)
    pub fn transactions_opened(&self) -> usize {
        self.transactions_opened.load(Ordering::SeqCst)
    }

    /// When set, every new transaction fails with `Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn begin(&self, stores: &[&str]) -> StorageResult<BTreeSet<String>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("database is closed".into()));
        }
        self.transactions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(stores.iter().map(|s| s.to_string()).collect())
    }
}

impl Database for MemoryDatabase {
    type Transaction = MemoryTransaction;

    async fn transaction(&self, stores: &[&str]) -> StorageResult<MemoryTransaction> {
        let scope = self.begin(stores)?;
        let guard = Arc::clone(&self.state).read_owned().await;
        let tx = MemoryTransaction {
            scope,
            access: Access::Read(guard),
        };
        tx.check_scope_exists()?;
        Ok(tx)
    }

    async fn write_transaction(&self, stores: &[&str]) -> StorageResult<MemoryTransaction> {
        let scope = self.begin(stores)?;
        let guard = Arc::clone(&self.state).write_owned().await;
        let working = MemoryState::clone(&guard);
        let tx = MemoryTransaction {
            scope,
            access: Access::Write { guard, working },
        };
        tx.check_scope_exists()?;
        Ok(tx)
    }
}

enum Access {
    Read(OwnedRwLockReadGuard<MemoryState>),
    Write {
        guard: OwnedRwLockWriteGuard<MemoryState>,
        working: MemoryState,
    },
}

/// Transaction over a [`MemoryDatabase`]
pub struct MemoryTransaction {
    scope: BTreeSet<String>,
    access: Access,
}

impl MemoryTransaction {
    fn state(&self) -> &MemoryState {
        match &self.access {
            Access::Read(guard) => &**guard,
            Access::Write { working, .. } => working,
        }
    }

    fn check_scope_exists(&self) -> StorageResult<()> {
        let state = self.state();
        for name in &self.scope {
            if !state.stores.contains_key(name) {
                return Err(StorageError::UnknownStore(name.clone()));
            }
        }
        Ok(())
    }

    fn store(&self, name: &str) -> StorageResult<&MemoryStore> {
        if !self.scope.contains(name) {
            return Err(StorageError::NotInScope(name.to_string()));
        }
        self.state()
            .stores
            .get(name)
            .ok_or_else(|| StorageError::UnknownStore(name.to_string()))
    }

    fn store_mut(&mut self, name: &str) -> StorageResult<&mut MemoryStore> {
        if !self.scope.contains(name) {
            return Err(StorageError::NotInScope(name.to_string()));
        }
        match &mut self.access {
            Access::Read(_) => Err(StorageError::ReadOnly),
            Access::Write { working, .. } => working
                .stores
                .get_mut(name)
                .ok_or_else(|| StorageError::UnknownStore(name.to_string())),
        }
    }
}

impl Transaction for MemoryTransaction {
    async fn open_cursor(
        &self,
        source: ScanSource<'_>,
        key: Option<&KeyRange>,
        direction: Direction,
        advance: usize,
        take: usize,
    ) -> StorageResult<Vec<Value>> {
        let store = self.store(source.store)?;
        Ok(store
            .scan(source.index, key, direction)?
            .skip(advance)
            .take(take)
            .cloned()
            .collect())
    }

    async fn get_all(
        &self,
        source: ScanSource<'_>,
        key: Option<&KeyRange>,
    ) -> StorageResult<Vec<Value>> {
        let store = self.store(source.store)?;
        Ok(store.scan(source.index, key, Direction::Next)?.cloned().collect())
    }

    async fn get(&self, store: &str, key: &IndexValue) -> StorageResult<Option<Value>> {
        Ok(self.store(store)?.records.get(key).cloned())
    }

    async fn put(&mut self, store: &str, value: Value) -> StorageResult<()> {
        self.store_mut(store)?.put(value)
    }

    async fn delete(&mut self, store: &str, key: &IndexValue) -> StorageResult<()> {
        self.store_mut(store)?.delete(key);
        Ok(())
    }

    async fn commit(self) -> StorageResult<()> {
        if let Access::Write { mut guard, working } = self.access {
            *guard = working;
        }
        Ok(())
    }
}
