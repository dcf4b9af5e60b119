//! Combinable sort chain
//!
//! A chain is an ordered list of criteria, most significant first. Two records
//! compare by the first criterion that tells them apart; if none does, they
//! are equal.
//!
//! Each criterion may offer a retrieval hint describing how it would be pushed
//! down to storage if it led the chain. Only the head's hint is used.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::retrieve::Comparator;

/// One sort criterion over records `T`, with retrieval hints of type `Q`
pub trait SortCriterion<T, Q>: Send + Sync {
    /// Short stable name, used in logs and chain descriptions
    fn name(&self) -> &str;

    fn compare(&self, a: &T, b: &T) -> Ordering;

    /// Storage hint when this criterion leads a chain.
    ///
    /// `chain` orders records by the whole chain and is the natural tie
    /// breaker for records this criterion considers equal.
    fn retrieve(&self, _chain: &Comparator<T>) -> Option<Q> {
        None
    }
}

/// Ordered list of criteria, first = highest priority
pub struct SortChain<T, Q> {
    name: String,
    criteria: Vec<Arc<dyn SortCriterion<T, Q>>>,
}

impl<T: 'static, Q: 'static> SortChain<T, Q> {
    /// Chain holding a single criterion, named after it
    pub fn new(criterion: impl SortCriterion<T, Q> + 'static) -> Self {
        let name = criterion.name().to_string();
        Self {
            name,
            criteria: vec![Arc::new(criterion)],
        }
    }

    /// Builds a named chain; the first criterion has the highest priority
    pub fn combine(
        name: impl Into<String>,
        criteria: impl IntoIterator<Item = Arc<dyn SortCriterion<T, Q>>>,
    ) -> Self {
        Self {
            name: name.into(),
            criteria: criteria.into_iter().collect(),
        }
    }

    /// Appends a lower-priority criterion
    pub fn then(mut self, criterion: impl SortCriterion<T, Q> + 'static) -> Self {
        self.criteria.push(Arc::new(criterion));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Criterion names in priority order
    pub fn criteria_names(&self) -> Vec<&str> {
        self.criteria.iter().map(|c| c.name()).collect()
    }

    pub fn compare(&self, a: &T, b: &T) -> Ordering {
        compare_all(&self.criteria, a, b)
    }

    /// The whole chain as a shared comparator
    pub fn comparator(&self) -> Comparator<T> {
        let criteria = self.criteria.clone();
        Arc::new(move |a: &T, b: &T| compare_all(&criteria, a, b))
    }

    /// Retrieval hint of the head criterion
    pub fn retrieve(&self) -> Option<Q> {
        let head = self.criteria.first()?;
        head.retrieve(&self.comparator())
    }

    /// Head hint, or `in_memory` applied to the chain comparator
    pub fn retrieve_or_else(&self, in_memory: impl FnOnce(Comparator<T>) -> Q) -> Q {
        self.retrieve()
            .unwrap_or_else(|| in_memory(self.comparator()))
    }

    /// Stable in-place sort by the chain
    pub fn sort(&self, records: &mut [T]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

fn compare_all<T, Q>(criteria: &[Arc<dyn SortCriterion<T, Q>>], a: &T, b: &T) -> Ordering {
    criteria
        .iter()
        .map(|criterion| criterion.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl<T, Q> Clone for SortChain<T, Q> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            criteria: self.criteria.clone(),
        }
    }
}

impl<T, Q> fmt::Debug for SortChain<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.criteria.iter().map(|c| c.name()).collect();
        f.debug_struct("SortChain")
            .field("name", &self.name)
            .field("criteria", &names)
            .finish()
    }
}

impl<T, Q> fmt::Display for SortChain<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{}", criterion.name())?;
        }
        Ok(())
    }
}
