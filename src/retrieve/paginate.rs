//! Paginated cursor walker
//!
//! Streams a scan one page at a time. Every page runs in its own read
//! transaction: the cursor is advanced past the entries already emitted and
//! reads at most `page_size + 1` entries. Only `page_size` are emitted; the
//! extra entry tells whether another page exists, so a range holding exactly
//! `page_size` entries ends after one transaction.
//!
//! The offset is not stable across writes that land between two pages.

use std::sync::Arc;

use futures_util::stream::{self, LocalBoxStream, StreamExt};
use serde_json::Value;

use super::errors::{RetrieveError, RetrieveResult};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::{Database, Direction, KeyRange, ScanSource, StorageResult, Transaction};

/// Where and how a paginated scan reads
#[derive(Debug, Clone, PartialEq)]
pub struct PageScan {
    pub store: String,
    pub index: Option<String>,
    pub key: Option<KeyRange>,
    pub direction: Direction,
    pub page_size: usize,
}

impl PageScan {
    /// Ascending scan over a whole store in primary key order
    pub fn new(store: impl Into<String>, page_size: usize) -> Self {
        Self {
            store: store.into(),
            index: None,
            key: None,
            direction: Direction::Next,
            page_size,
        }
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_key(mut self, key: KeyRange) -> Self {
        self.key = Some(key);
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn source(&self) -> ScanSource<'_> {
        ScanSource::new(&self.store, self.index.as_deref())
    }
}

/// Lazily streams every entry of `scan`, extracted with `extract`.
///
/// A storage failure ends the stream with one error item. An entry that fails
/// to extract yields an error item and the scan continues.
pub fn paginate<'a, D, T, F>(
    database: &'a D,
    scan: PageScan,
    extract: F,
) -> RetrieveResult<LocalBoxStream<'a, RetrieveResult<T>>>
where
    D: Database,
    T: 'a,
    F: Fn(&Value) -> RetrieveResult<T> + 'a,
{
    if scan.page_size == 0 {
        return Err(RetrieveError::page_size_invalid(scan.page_size));
    }

    let scan = Arc::new(scan);
    let pages = stream::unfold(Some(0usize), move |offset| {
        let scan = Arc::clone(&scan);
        async move {
            let offset = offset?;
            let read_result = read_page(database, &scan, offset).await;
            let page: Vec<RetrieveResult<Value>> = match read_result {
                Ok(mut entries) => {
                    let more = entries.len() > scan.page_size;
                    entries.truncate(scan.page_size);
                    let read = entries.len();
                    log_event_with_fields(
                        Event::PageFetched,
                        &[
                            ("offset", &offset.to_string()),
                            ("read", &read.to_string()),
                            ("store", &scan.store),
                        ],
                    );
                    if more {
                        let full: Vec<RetrieveResult<Value>> =
                            entries.into_iter().map(Ok).collect();
                        return Some((full, Some(offset + read)));
                    }
                    log_event_with_fields(
                        Event::StreamComplete,
                        &[
                            ("store", &scan.store),
                            ("total", &(offset + read).to_string()),
                        ],
                    );
                    entries.into_iter().map(Ok).collect()
                }
                Err(err) => {
                    log_event_with_fields(
                        Event::StorageFailed,
                        &[
                            ("code", err.code()),
                            ("offset", &offset.to_string()),
                            ("store", &scan.store),
                        ],
                    );
                    vec![Err(RetrieveError::from(err))]
                }
            };
            Some((page, None))
        }
    });

    let records = pages
        .flat_map(stream::iter)
        .map(move |entry| entry.and_then(|value| extract_logged(&extract, &value)));

    Ok(records.boxed_local())
}

async fn read_page<D: Database>(
    database: &D,
    scan: &PageScan,
    offset: usize,
) -> StorageResult<Vec<Value>> {
    let tx = database.transaction(&[scan.store.as_str()]).await?;
    tx.open_cursor(
        scan.source(),
        scan.key.as_ref(),
        scan.direction,
        offset,
        scan.page_size.saturating_add(1),
    )
    .await
}

fn extract_logged<T, F>(extract: &F, value: &Value) -> RetrieveResult<T>
where
    F: Fn(&Value) -> RetrieveResult<T>,
{
    extract(value).map_err(|err| {
        log_event_with_fields(Event::ExtractionFailed, &[("reason", err.message())]);
        err
    })
}
