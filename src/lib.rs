//! markdb - query, pagination and sorting engine for a local bookmark store
//!
//! Turns composable query descriptors (sort, filter, fallback sort) into lazily
//! paginated, correctly ordered record streams over an indexed, transactional store.

pub mod bookmark;
pub mod config;
pub mod observability;
pub mod retrieve;
pub mod schema;
pub mod sort;
pub mod storage;
