//! Sorting
//!
//! Sorts are chains of criteria that compare in memory and, through the head
//! criterion, can describe how to retrieve records already in that order.

mod chain;

pub use chain::{SortChain, SortCriterion};
