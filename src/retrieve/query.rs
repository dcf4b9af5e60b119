//! Retrieval query types
//!
//! A [`RetrieveQuery`] is what a caller asks for: sort by a field (optionally
//! within a range) or filter on a field. A [`DatabaseQuery`] is the resolved,
//! storage-facing form: which index, which key range, which direction, and
//! what has to happen in memory afterwards.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::storage::{Direction, KeyRange};

/// Shared total order over records
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Shared predicate over records
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Sort on a field, optionally restricted to `[from, to]`
pub struct SortQuery<T, R> {
    pub ascending: bool,
    pub from: Option<R>,
    pub to: Option<R>,
    /// Orders records sharing the same field value
    pub fallback: Option<Comparator<T>>,
}

impl<T, R> SortQuery<T, R> {
    pub fn new(ascending: bool) -> Self {
        Self {
            ascending,
            from: None,
            to: None,
            fallback: None,
        }
    }

    pub fn from(mut self, from: R) -> Self {
        self.from = Some(from);
        self
    }

    pub fn to(mut self, to: R) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_fallback(mut self, fallback: Comparator<T>) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl<T, R: Clone> Clone for SortQuery<T, R> {
    fn clone(&self) -> Self {
        Self {
            ascending: self.ascending,
            from: self.from.clone(),
            to: self.to.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

impl<T, R: fmt::Debug> fmt::Debug for SortQuery<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortQuery")
            .field("ascending", &self.ascending)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

/// Exact match on a field
#[derive(Debug, Clone, PartialEq)]
pub struct FilterQuery<R> {
    pub target: R,
}

/// What a caller asks the resolver for
pub enum RetrieveQuery<T, R> {
    Sort(SortQuery<T, R>),
    Filter(FilterQuery<R>),
}

impl<T, R> RetrieveQuery<T, R> {
    /// Full sort in the given direction
    pub fn sort(ascending: bool) -> Self {
        RetrieveQuery::Sort(SortQuery::new(ascending))
    }

    /// Exact match on `target`
    pub fn filter(target: R) -> Self {
        RetrieveQuery::Filter(FilterQuery { target })
    }
}

impl<T, R> From<SortQuery<T, R>> for RetrieveQuery<T, R> {
    fn from(sort: SortQuery<T, R>) -> Self {
        RetrieveQuery::Sort(sort)
    }
}

impl<T, R: Clone> Clone for RetrieveQuery<T, R> {
    fn clone(&self) -> Self {
        match self {
            RetrieveQuery::Sort(sort) => RetrieveQuery::Sort(sort.clone()),
            RetrieveQuery::Filter(filter) => RetrieveQuery::Filter(filter.clone()),
        }
    }
}

impl<T, R: fmt::Debug> fmt::Debug for RetrieveQuery<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveQuery::Sort(sort) => f.debug_tuple("Sort").field(sort).finish(),
            RetrieveQuery::Filter(filter) => f.debug_tuple("Filter").field(filter).finish(),
        }
    }
}

/// In-memory tie breaking applied to runs of records the index leaves unordered.
///
/// Records are in the same run when `same_group` holds for neighbours. The
/// scan order must already keep each group contiguous; this is assumed, not
/// checked.
pub struct FallbackSort<T> {
    same_group: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
    comparator: Comparator<T>,
}

impl<T> FallbackSort<T> {
    /// Groups records by the value `field` extracts. Missing values group together.
    pub fn by_field<R, F>(field: F, comparator: Comparator<T>) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
        R: PartialEq,
    {
        Self {
            same_group: Arc::new(move |a: &T, b: &T| field(a) == field(b)),
            comparator,
        }
    }

    /// Puts every record into one run, i.e. a full in-memory sort
    pub fn whole(comparator: Comparator<T>) -> Self {
        Self {
            same_group: Arc::new(|_: &T, _: &T| true),
            comparator,
        }
    }

    pub fn same_group(&self, a: &T, b: &T) -> bool {
        (self.same_group)(a, b)
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        (self.comparator)(a, b)
    }

    pub fn comparator(&self) -> &Comparator<T> {
        &self.comparator
    }
}

impl<T> Clone for FallbackSort<T> {
    fn clone(&self) -> Self {
        Self {
            same_group: Arc::clone(&self.same_group),
            comparator: Arc::clone(&self.comparator),
        }
    }
}

/// Resolved, storage-facing query
pub struct DatabaseQuery<T> {
    /// Index to scan; `None` scans the store in primary key order
    pub index_name: Option<String>,
    /// Range or point key; `None` scans the whole index or store
    pub key: Option<KeyRange>,
    /// Scan in descending key order
    pub reverse: bool,
    pub fallback: Option<FallbackSort<T>>,
    /// Applied to every record after fallback sorting
    pub post_filter: Option<Predicate<T>>,
}

impl<T> DatabaseQuery<T> {
    /// Unconditional scan of the whole store
    pub fn full_scan() -> Self {
        Self {
            index_name: None,
            key: None,
            reverse: false,
            fallback: None,
            post_filter: None,
        }
    }

    pub fn direction(&self) -> Direction {
        Direction::from_reverse(self.reverse)
    }

    /// Returns true if the post-filter (if any) keeps `record`
    pub fn accepts(&self, record: &T) -> bool {
        passes(self.post_filter.as_ref(), record)
    }
}

/// A missing post-filter keeps everything
pub(crate) fn passes<T>(post_filter: Option<&Predicate<T>>, record: &T) -> bool {
    post_filter.map_or(true, |keep| keep(record))
}

impl<T> Default for DatabaseQuery<T> {
    fn default() -> Self {
        Self::full_scan()
    }
}

impl<T> Clone for DatabaseQuery<T> {
    fn clone(&self) -> Self {
        Self {
            index_name: self.index_name.clone(),
            key: self.key.clone(),
            reverse: self.reverse,
            fallback: self.fallback.clone(),
            post_filter: self.post_filter.clone(),
        }
    }
}

impl<T> fmt::Debug for DatabaseQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseQuery")
            .field("index_name", &self.index_name)
            .field("key", &self.key)
            .field("reverse", &self.reverse)
            .field("fallback", &self.fallback.is_some())
            .field("post_filter", &self.post_filter.is_some())
            .finish()
    }
}
