//! Chunking fallback sorter
//!
//! An index scan orders records by the index key but leaves ties in primary
//! key order. This module reorders each maximal run of neighbours in the same
//! fallback group by the fallback comparator. Runs keep their position; there
//! is no global re-sort, and groups split across the scan stay split.

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{Stream, StreamExt};
use futures_util::ready;

use super::errors::{RetrieveErrorCode, RetrieveResult};
use super::query::FallbackSort;

/// Stream adapter that buffers one run at a time.
///
/// Extraction errors are forwarded as soon as they arrive and do not end the
/// current run. A storage error flushes the open run, is emitted last, and
/// ends the stream.
pub struct Chunked<S, T> {
    inner: S,
    fallback: FallbackSort<T>,
    run: Vec<T>,
    ready: VecDeque<RetrieveResult<T>>,
    finished: bool,
}

impl<S, T> Chunked<S, T>
where
    S: Stream<Item = RetrieveResult<T>> + Unpin,
{
    pub fn new(inner: S, fallback: FallbackSort<T>) -> Self {
        Self {
            inner,
            fallback,
            run: Vec::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn flush(&mut self) {
        let mut run = mem::take(&mut self.run);
        run.sort_by(|a, b| self.fallback.compare(a, b));
        self.ready.extend(run.into_iter().map(Ok));
    }
}

// Records are buffered by value and never pinned
impl<S: Unpin, T> Unpin for Chunked<S, T> {}

impl<S, T> Stream for Chunked<S, T>
where
    S: Stream<Item = RetrieveResult<T>> + Unpin,
{
    type Item = RetrieveResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.poll_next_unpin(cx)) {
                Some(Ok(record)) => {
                    let splits = this
                        .run
                        .last()
                        .map_or(false, |last| !this.fallback.same_group(last, &record));
                    if splits {
                        this.flush();
                    }
                    this.run.push(record);
                }
                Some(Err(err)) if err.code() == RetrieveErrorCode::MarkStorageFailed => {
                    this.flush();
                    this.ready.push_back(Err(err));
                    this.finished = true;
                }
                Some(Err(err)) => this.ready.push_back(Err(err)),
                None => {
                    this.flush();
                    this.finished = true;
                }
            }
        }
    }
}

/// Sorts each run of `records` in place
pub fn sort_runs<T>(records: &mut [T], fallback: &FallbackSort<T>) {
    for run in records.chunk_by_mut(|a, b| fallback.same_group(a, b)) {
        run.sort_by(|a, b| fallback.compare(a, b));
    }
}
