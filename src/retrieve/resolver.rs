//! Query resolver
//!
//! Turns one [`RetrieveQuery`] into one [`DatabaseQuery`].
//!
//! Sort rules:
//! - `from` and `to` → bounded range, only `from` → lower bound, only `to` →
//!   upper bound, neither → whole index
//! - descending sort scans in reverse
//! - a fallback comparator becomes a [`FallbackSort`] grouped by the sorted field
//! - the target must be backed by an index declared on the store
//!
//! Filter rules:
//! - indexed target → point key on the index
//! - unindexed target → full scan plus a post-filter on the extracted field

use std::fmt;
use std::sync::Arc;

use super::errors::{RetrieveError, RetrieveResult};
use super::query::{DatabaseQuery, FallbackSort, Predicate, RetrieveQuery, SortQuery};
use crate::schema::IndexSchema;
use crate::storage::{IndexValue, KeyRange, ToIndexValue};

type FieldFn<T, R> = Arc<dyn Fn(&T) -> Option<R> + Send + Sync>;
type KeyMapper<R> = Arc<dyn Fn(&R) -> IndexValue + Send + Sync>;

/// The record field a query targets, and the index it is built on if any
pub struct FieldTarget<T, R> {
    name: String,
    index: Option<(String, KeyMapper<R>)>,
    field: FieldFn<T, R>,
}

impl<T, R> FieldTarget<T, R> {
    /// Field backed by `index`, whose values index as they are
    pub fn indexed<F>(index: impl Into<String>, field: F) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
        R: ToIndexValue,
    {
        Self::indexed_mapped(index, field, |value: &R| value.to_index_value())
    }

    /// Field backed by `index`, whose in-memory values are converted by `to_key`
    pub fn indexed_mapped<F, M>(index: impl Into<String>, field: F, to_key: M) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
        M: Fn(&R) -> IndexValue + Send + Sync + 'static,
    {
        let index = index.into();
        Self {
            name: index.clone(),
            index: Some((index, Arc::new(to_key))),
            field: Arc::new(field),
        }
    }

    /// Field without an index; filters on it are applied in memory
    pub fn unindexed<F>(name: impl Into<String>, field: F) -> Self
    where
        F: Fn(&T) -> Option<R> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            index: None,
            field: Arc::new(field),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index.as_ref().map(|(name, _)| name.as_str())
    }

    /// Extracts the target field from a record
    pub fn extract(&self, record: &T) -> Option<R> {
        (self.field)(record)
    }
}

impl<T, R> Clone for FieldTarget<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            index: self
                .index
                .as_ref()
                .map(|(name, to_key)| (name.clone(), Arc::clone(to_key))),
            field: Arc::clone(&self.field),
        }
    }
}

impl<T, R> fmt::Debug for FieldTarget<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTarget")
            .field("name", &self.name)
            .field("index", &self.index_name())
            .finish()
    }
}

/// Resolves `query` against `target` on the store described by `schema`
pub fn resolve<T, R>(
    query: &RetrieveQuery<T, R>,
    target: &FieldTarget<T, R>,
    schema: &IndexSchema,
) -> RetrieveResult<DatabaseQuery<T>>
where
    T: 'static,
    R: PartialEq + Clone + Send + Sync + 'static,
{
    match query {
        RetrieveQuery::Sort(sort) => resolve_sort(sort, target, schema),
        RetrieveQuery::Filter(filter) => Ok(resolve_filter(&filter.target, target, schema)),
    }
}

fn resolve_sort<T, R>(
    sort: &SortQuery<T, R>,
    target: &FieldTarget<T, R>,
    schema: &IndexSchema,
) -> RetrieveResult<DatabaseQuery<T>>
where
    T: 'static,
    R: PartialEq + 'static,
{
    let (index_name, to_key) = match &target.index {
        Some((name, to_key)) if schema.has_index(name) => (name, to_key),
        Some((name, _)) => {
            return Err(RetrieveError::sort_not_indexed(
                schema.store_name(),
                Some(name.as_str()),
            ))
        }
        None => {
            return Err(RetrieveError::sort_not_indexed(
                schema.store_name(),
                Some(target.name()),
            ))
        }
    };

    let from = sort.from.as_ref().map(|v| to_key(v));
    let to = sort.to.as_ref().map(|v| to_key(v));
    let key = match (from, to) {
        (Some(lower), Some(upper)) => {
            if lower > upper {
                return Err(RetrieveError::query_invalid(format!(
                    "Sort range on '{}' has lower bound {} above upper bound {}",
                    index_name, lower, upper
                )));
            }
            Some(KeyRange::bound(lower, upper))
        }
        (Some(lower), None) => Some(KeyRange::lower_bound(lower)),
        (None, Some(upper)) => Some(KeyRange::upper_bound(upper)),
        (None, None) => None,
    };

    let fallback = sort.fallback.as_ref().map(|comparator| {
        let field = Arc::clone(&target.field);
        FallbackSort::by_field(move |record: &T| field(record), Arc::clone(comparator))
    });

    Ok(DatabaseQuery {
        index_name: Some(index_name.clone()),
        key,
        reverse: !sort.ascending,
        fallback,
        post_filter: None,
    })
}

fn resolve_filter<T, R>(
    value: &R,
    target: &FieldTarget<T, R>,
    schema: &IndexSchema,
) -> DatabaseQuery<T>
where
    T: 'static,
    R: PartialEq + Clone + Send + Sync + 'static,
{
    match &target.index {
        Some((name, to_key)) if schema.has_index(name) => DatabaseQuery {
            index_name: Some(name.clone()),
            key: Some(KeyRange::only(to_key(value))),
            ..DatabaseQuery::full_scan()
        },
        _ => {
            let field = Arc::clone(&target.field);
            let wanted = value.clone();
            let post_filter: Predicate<T> =
                Arc::new(move |record: &T| field(record).as_ref() == Some(&wanted));
            DatabaseQuery {
                post_filter: Some(post_filter),
                ..DatabaseQuery::full_scan()
            }
        }
    }
}
