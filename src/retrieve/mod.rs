//! Query and retrieval engine
//!
//! A caller query is resolved into a [`DatabaseQuery`] by [`resolve`], read
//! page by page by [`paginate`] (or in one transaction), tie-sorted by
//! [`Chunked`], post-filtered and handed to the record source's `post_fetch`
//! hook. [`DatabaseRetrieveResolver`] wires these together.

mod chunked;
mod errors;
mod explain;
mod paginate;
mod query;
mod resolve;
mod resolver;

pub use chunked::{sort_runs, Chunked};
pub use errors::{RetrieveError, RetrieveErrorCode, RetrieveResult, Severity};
pub use explain::{ExplainQuery, FetchMode};
pub use paginate::{paginate, PageScan};
pub use query::{
    Comparator, DatabaseQuery, FallbackSort, FilterQuery, Predicate, RetrieveQuery, SortQuery,
};
pub use resolve::{DatabaseRetrieveResolver, RecordSource};
pub use resolver::{resolve, FieldTarget};
