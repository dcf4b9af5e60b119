//! Retrieve resolver
//!
//! Orchestrates one fetch: resolve the caller's query, read the store in one
//! of two modes, then apply fallback sorting, post-filtering and the
//! `post_fetch` hook.
//!
//! - Streaming mode reads page by page, one transaction per page, and holds
//!   at most one page plus one fallback run in memory.
//! - Materialized mode reads the whole range in a single transaction. It is
//!   meant for callers that reorder records while browsing, where paging
//!   would observe shifting offsets.
//!
//! Resolution errors are returned before the store is touched. Storage errors
//! end the stream and are never retried here.

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::{self, LocalBoxStream, StreamExt, TryStreamExt};
use serde_json::Value;

use super::chunked::{sort_runs, Chunked};
use super::errors::{RetrieveError, RetrieveResult};
use super::explain::{ExplainQuery, FetchMode};
use super::paginate::{paginate, PageScan};
use super::query::{passes, DatabaseQuery, Predicate};
use crate::config::RetrieveConfig;
use crate::observability::{log_event_with_fields, Event};
use crate::schema::IndexSchema;
use crate::storage::{Database, ScanSource, StorageResult, Transaction};

/// Record-type specific hooks of a resolver
#[allow(async_fn_in_trait)]
pub trait RecordSource<D: Database> {
    type Record: 'static;
    type Query;

    /// Schema of the store records are read from
    fn schema(&self) -> &IndexSchema;

    /// Turns a stored entry into a record
    fn extract(&self, value: &Value) -> RetrieveResult<Self::Record>;

    /// Turns a caller query into a storage query
    fn resolve_query(&self, query: &Self::Query) -> RetrieveResult<DatabaseQuery<Self::Record>>;

    /// Enriches every delivered record. Identity by default.
    async fn post_fetch(&self, _database: &D, record: Self::Record) -> RetrieveResult<Self::Record> {
        Ok(record)
    }
}

/// Resolver reading records of one store through a [`RecordSource`]
pub struct DatabaseRetrieveResolver<D, S> {
    database: Arc<D>,
    source: S,
    config: RetrieveConfig,
}

impl<D, S> DatabaseRetrieveResolver<D, S>
where
    D: Database,
    S: RecordSource<D>,
{
    pub fn new(database: Arc<D>, source: S, config: RetrieveConfig) -> Self {
        Self {
            database,
            source,
            config,
        }
    }

    pub fn database(&self) -> &Arc<D> {
        &self.database
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RetrieveConfig {
        &self.config
    }

    fn store_name(&self) -> &str {
        self.source.schema().store_name()
    }

    fn resolve(&self, query: Option<&S::Query>) -> RetrieveResult<DatabaseQuery<S::Record>> {
        match query {
            Some(query) => self.source.resolve_query(query),
            None => Ok(DatabaseQuery::full_scan()),
        }
    }

    fn mode(&self, has_reordering_actions: bool) -> FetchMode {
        if has_reordering_actions {
            FetchMode::Materialized
        } else {
            FetchMode::Streaming {
                page_size: self.config.page_size,
            }
        }
    }

    /// Describes how `fetch` would read, without reading
    pub fn explain(&self, query: Option<&S::Query>, has_reordering_actions: bool) -> ExplainQuery {
        match self.resolve(query) {
            Ok(db_query) => ExplainQuery::from_query(
                self.store_name(),
                &db_query,
                self.mode(has_reordering_actions),
            ),
            Err(err) => ExplainQuery::from_error(self.store_name(), &err),
        }
    }

    /// Lazily fetches the records matching `query`; `None` reads the whole store.
    ///
    /// `has_reordering_actions` selects materialized mode.
    pub fn fetch(
        &self,
        query: Option<&S::Query>,
        has_reordering_actions: bool,
    ) -> RetrieveResult<LocalBoxStream<'_, RetrieveResult<S::Record>>> {
        let mode = self.mode(has_reordering_actions);
        let db_query = match self.resolve(query) {
            Ok(db_query) => db_query,
            Err(err) => {
                let explain = ExplainQuery::from_error(self.store_name(), &err);
                log_explain(Event::QueryRejected, &explain);
                return Err(err);
            }
        };
        log_explain(
            Event::QueryResolved,
            &ExplainQuery::from_query(self.store_name(), &db_query, mode),
        );

        let post_filter = db_query.post_filter.clone();
        let records = match mode {
            FetchMode::Streaming { page_size } => self.stream_pages(db_query, page_size)?,
            FetchMode::Materialized => self.materialize(db_query),
        };
        Ok(self.deliver(records, post_filter))
    }

    /// Collects a fetch, failing on the first error
    pub async fn fetch_all(
        &self,
        query: Option<&S::Query>,
        has_reordering_actions: bool,
    ) -> RetrieveResult<Vec<S::Record>> {
        self.fetch(query, has_reordering_actions)?
            .try_collect()
            .await
    }

    fn stream_pages(
        &self,
        db_query: DatabaseQuery<S::Record>,
        page_size: usize,
    ) -> RetrieveResult<LocalBoxStream<'_, RetrieveResult<S::Record>>> {
        let direction = db_query.direction();
        let DatabaseQuery {
            index_name,
            key,
            fallback,
            ..
        } = db_query;

        let scan = PageScan {
            store: self.store_name().to_string(),
            index: index_name,
            key,
            direction,
            page_size,
        };
        let pages = paginate(self.database.as_ref(), scan, move |value: &Value| {
            self.source.extract(value)
        })?;
        log_event_with_fields(
            Event::StreamBegin,
            &[
                ("page_size", &page_size.to_string()),
                ("store", self.store_name()),
            ],
        );
        Ok(match fallback {
            Some(fallback) => Chunked::new(pages, fallback).boxed_local(),
            None => pages,
        })
    }

    fn materialize(
        &self,
        db_query: DatabaseQuery<S::Record>,
    ) -> LocalBoxStream<'_, RetrieveResult<S::Record>> {
        stream::once(async move { self.read_all(&db_query).await })
            .flat_map(stream::iter)
            .boxed_local()
    }

    async fn read_range(
        &self,
        source: ScanSource<'_>,
        db_query: &DatabaseQuery<S::Record>,
    ) -> StorageResult<Vec<Value>> {
        let tx = self.database.transaction(&[source.store]).await?;
        tx.get_all(source, db_query.key.as_ref()).await
    }

    async fn read_all(&self, db_query: &DatabaseQuery<S::Record>) -> Vec<RetrieveResult<S::Record>> {
        let store = self.store_name();
        let source = ScanSource::new(store, db_query.index_name.as_deref());

        let values = match self.read_range(source, db_query).await {
            Ok(values) => values,
            Err(err) => {
                log_event_with_fields(
                    Event::StorageFailed,
                    &[("code", err.code()), ("store", store)],
                );
                return vec![Err(RetrieveError::from(err))];
            }
        };

        let mut failures = Vec::new();
        let mut records = Vec::with_capacity(values.len());
        for value in &values {
            match self.source.extract(value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    log_event_with_fields(Event::ExtractionFailed, &[("reason", err.message())]);
                    failures.push(Err(err));
                }
            }
        }

        if db_query.reverse {
            records.reverse();
        }
        if let Some(fallback) = &db_query.fallback {
            sort_runs(&mut records, fallback);
        }

        log_event_with_fields(
            Event::MaterializeComplete,
            &[
                ("failed", &failures.len().to_string()),
                ("read", &records.len().to_string()),
                ("store", store),
            ],
        );
        failures.extend(records.into_iter().map(Ok));
        failures
    }

    fn deliver<'a>(
        &'a self,
        records: LocalBoxStream<'a, RetrieveResult<S::Record>>,
        post_filter: Option<Predicate<S::Record>>,
    ) -> LocalBoxStream<'a, RetrieveResult<S::Record>> {
        records
            .filter(move |item| {
                let keep = match item {
                    Ok(record) => passes(post_filter.as_ref(), record),
                    Err(_) => true,
                };
                future::ready(keep)
            })
            .then(move |item| async move {
                match item {
                    Ok(record) => self.source.post_fetch(&self.database, record).await,
                    Err(err) => Err(err),
                }
            })
            .boxed_local()
    }
}

fn log_explain(event: Event, explain: &ExplainQuery) {
    let fields = explain.log_fields();
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    log_event_with_fields(event, &borrowed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieve::query::{Comparator, FallbackSort};
    use crate::storage::{IndexValue, KeyRange, MemoryDatabase};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: i64,
        rank: i64,
        pinned: bool,
        label: Option<String>,
    }

    enum NoteQuery {
        RankFrom(i64),
        RankDescending,
        RankWithIdFallback,
        Pinned,
        Broken,
    }

    struct NoteSource {
        schema: IndexSchema,
    }

    impl NoteSource {
        fn new() -> Self {
            Self {
                schema: IndexSchema::new("notes", ["id"], ["rank"]),
            }
        }
    }

    impl RecordSource<MemoryDatabase> for NoteSource {
        type Record = Note;
        type Query = NoteQuery;

        fn schema(&self) -> &IndexSchema {
            &self.schema
        }

        fn extract(&self, value: &Value) -> RetrieveResult<Note> {
            let id = value["id"]
                .as_i64()
                .ok_or_else(|| RetrieveError::extraction_failed("note without id"))?;
            Ok(Note {
                id,
                rank: value["rank"].as_i64().unwrap_or_default(),
                pinned: value["pinned"].as_bool().unwrap_or(false),
                label: None,
            })
        }

        fn resolve_query(&self, query: &NoteQuery) -> RetrieveResult<DatabaseQuery<Note>> {
            let by_rank = DatabaseQuery {
                index_name: Some("rank".to_string()),
                ..DatabaseQuery::full_scan()
            };
            match query {
                NoteQuery::RankFrom(from) => Ok(DatabaseQuery {
                    key: Some(KeyRange::lower_bound(IndexValue::from_int(*from))),
                    ..by_rank
                }),
                NoteQuery::RankDescending => Ok(DatabaseQuery {
                    reverse: true,
                    ..by_rank
                }),
                NoteQuery::RankWithIdFallback => {
                    let by_id_desc: Comparator<Note> =
                        Arc::new(|a: &Note, b: &Note| b.id.cmp(&a.id));
                    Ok(DatabaseQuery {
                        fallback: Some(FallbackSort::by_field(|n: &Note| Some(n.rank), by_id_desc)),
                        ..by_rank
                    })
                }
                NoteQuery::Pinned => {
                    let pinned: Predicate<Note> = Arc::new(|n: &Note| n.pinned);
                    Ok(DatabaseQuery {
                        post_filter: Some(pinned),
                        ..DatabaseQuery::full_scan()
                    })
                }
                NoteQuery::Broken => Err(RetrieveError::query_invalid("broken query")),
            }
        }

        async fn post_fetch(&self, _database: &MemoryDatabase, mut note: Note) -> RetrieveResult<Note> {
            note.label = Some(format!("note-{}", note.id));
            Ok(note)
        }
    }

    async fn resolver(page_size: usize) -> DatabaseRetrieveResolver<MemoryDatabase, NoteSource> {
        let db = MemoryDatabase::new([IndexSchema::new("notes", ["id"], ["rank"])]);
        let mut tx = db.write_transaction(&["notes"]).await.unwrap();
        for (id, rank, pinned) in [(1, 3, false), (2, 1, true), (3, 2, false), (4, 1, false), (5, 2, true)] {
            tx.put("notes", json!({"id": id, "rank": rank, "pinned": pinned}))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        let config = RetrieveConfig::default().with_page_size(page_size);
        DatabaseRetrieveResolver::new(Arc::new(db), NoteSource::new(), config)
    }

    fn ids(notes: &[Note]) -> Vec<i64> {
        notes.iter().map(|n| n.id).collect()
    }

    #[tokio::test]
    async fn test_no_query_reads_whole_store() {
        let resolver = resolver(2).await;
        let notes = resolver.fetch_all(None, false).await.unwrap();
        assert_eq!(ids(&notes), vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_post_fetch_applies_in_both_modes() {
        let resolver = resolver(2).await;
        for materialized in [false, true] {
            let notes = resolver.fetch_all(None, materialized).await.unwrap();
            assert!(notes
                .iter()
                .all(|n| n.label == Some(format!("note-{}", n.id))));
        }
    }

    #[tokio::test]
    async fn test_range_query() {
        let resolver = resolver(2).await;
        let notes = resolver
            .fetch_all(Some(&NoteQuery::RankFrom(2)), false)
            .await
            .unwrap();
        assert_eq!(ids(&notes), vec![3, 5, 1]);
    }

    #[tokio::test]
    async fn test_modes_agree() {
        let resolver = resolver(2).await;
        for query in [
            NoteQuery::RankFrom(2),
            NoteQuery::RankDescending,
            NoteQuery::RankWithIdFallback,
            NoteQuery::Pinned,
        ] {
            let streamed = resolver.fetch_all(Some(&query), false).await.unwrap();
            let materialized = resolver.fetch_all(Some(&query), true).await.unwrap();
            assert_eq!(streamed, materialized);
        }
    }

    #[tokio::test]
    async fn test_fallback_orders_ties() {
        let resolver = resolver(2).await;
        let notes = resolver
            .fetch_all(Some(&NoteQuery::RankWithIdFallback), false)
            .await
            .unwrap();
        // rank 1: ids 2, 4; rank 2: ids 3, 5; rank 3: id 1; ties by id descending
        assert_eq!(ids(&notes), vec![4, 2, 5, 3, 1]);
    }

    #[tokio::test]
    async fn test_post_filter() {
        let resolver = resolver(2).await;
        let db_query = resolver.source().resolve_query(&NoteQuery::Pinned).unwrap();
        let everything = resolver.fetch_all(None, false).await.unwrap();
        let accepted: Vec<i64> = everything
            .iter()
            .filter(|note| db_query.accepts(note))
            .map(|note| note.id)
            .collect();

        for materialized in [false, true] {
            let notes = resolver
                .fetch_all(Some(&NoteQuery::Pinned), materialized)
                .await
                .unwrap();
            assert_eq!(ids(&notes), vec![2, 5]);
            assert_eq!(ids(&notes), accepted);
        }
    }

    #[tokio::test]
    async fn test_rejected_query_touches_no_storage() {
        let resolver = resolver(2).await;
        let before = resolver.database().transactions_opened();

        let err = resolver.fetch(Some(&NoteQuery::Broken), false).err().unwrap();
        assert!(err.is_configuration());
        let err = resolver.fetch(Some(&NoteQuery::Broken), true).err().unwrap();
        assert!(err.is_configuration());

        assert_eq!(resolver.database().transactions_opened(), before);
    }

    #[tokio::test]
    async fn test_materialized_uses_one_transaction() {
        let resolver = resolver(1).await;
        let before = resolver.database().transactions_opened();
        let notes = resolver.fetch_all(None, true).await.unwrap();
        assert_eq!(notes.len(), 5);
        assert_eq!(resolver.database().transactions_opened() - before, 1);
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let resolver = resolver(2).await;
        resolver.database().set_unavailable(true);

        for materialized in [false, true] {
            let err = resolver.fetch_all(None, materialized).await.unwrap_err();
            assert_eq!(err.code().code(), "MARK_STORAGE_FAILED");
        }
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected_in_streaming_mode() {
        let resolver = resolver(0).await;
        let err = resolver.fetch(None, false).err().unwrap();
        assert_eq!(err.code().code(), "MARK_QUERY_PAGE_SIZE_INVALID");
    }

    #[tokio::test]
    async fn test_explain() {
        let resolver = resolver(4).await;
        let explain = resolver.explain(Some(&NoteQuery::RankDescending), false);
        assert!(explain.accepted);
        assert_eq!(explain.index.as_deref(), Some("rank"));
        assert_eq!(explain.mode, Some(FetchMode::Streaming { page_size: 4 }));

        let rejected = resolver.explain(Some(&NoteQuery::Broken), true);
        assert!(!rejected.accepted);
        assert_eq!(rejected.rejection_code.as_deref(), Some("MARK_QUERY_INVALID"));
    }
}
