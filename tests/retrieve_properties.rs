//! Retrieval Property Tests
//!
//! Properties every fetch must hold regardless of page size or mode:
//! - Paging never drops or duplicates records
//! - Ties on the index key come out in fallback order, even across pages
//! - Streaming and materialized fetches agree
//! - Descending scans mirror ascending ones
//! - Repeated fetches are identical
//! - A storage failure is the last item of a stream

use std::cmp::Ordering;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use futures_util::StreamExt;
use markdb::config::RetrieveConfig;
use markdb::retrieve::{
    resolve, Comparator, DatabaseQuery, DatabaseRetrieveResolver, FieldTarget, RecordSource,
    RetrieveError, RetrieveErrorCode, RetrieveQuery, RetrieveResult, SortQuery,
};
use markdb::schema::IndexSchema;
use markdb::storage::{
    Database, MemoryDatabase, MemoryTransaction, StorageError, StorageResult, Transaction,
};
use proptest::prelude::*;
use serde_json::{json, Value};

// =============================================================================
// Helper Types
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Task {
    id: i64,
    rank: i64,
    state: String,
}

#[derive(Clone)]
enum TaskQuery {
    Rank(RetrieveQuery<Task, i64>),
    State(RetrieveQuery<Task, String>),
}

struct TaskSource {
    schema: IndexSchema,
}

impl TaskSource {
    fn new() -> Self {
        Self {
            schema: IndexSchema::new("tasks", ["id"], ["rank"]),
        }
    }
}

impl<D: Database> RecordSource<D> for TaskSource {
    type Record = Task;
    type Query = TaskQuery;

    fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    fn extract(&self, value: &Value) -> RetrieveResult<Task> {
        let field = |name: &str| value.get(name).cloned();
        match (
            field("id").and_then(|v| v.as_i64()),
            field("rank").and_then(|v| v.as_i64()),
            field("state").and_then(|v| v.as_str().map(str::to_string)),
        ) {
            (Some(id), Some(rank), Some(state)) => Ok(Task { id, rank, state }),
            _ => Err(RetrieveError::extraction_failed(format!("bad task {}", value))),
        }
    }

    fn resolve_query(&self, query: &TaskQuery) -> RetrieveResult<DatabaseQuery<Task>> {
        match query {
            TaskQuery::Rank(q) => resolve(
                q,
                &FieldTarget::indexed("rank", |t: &Task| Some(t.rank)),
                &self.schema,
            ),
            TaskQuery::State(q) => resolve(
                q,
                &FieldTarget::unindexed("state", |t: &Task| Some(t.state.clone())),
                &self.schema,
            ),
        }
    }
}

type TaskResolver = DatabaseRetrieveResolver<MemoryDatabase, TaskSource>;

/// Memory database whose `fail_on`-th read transaction (1-based) fails
struct FailingDatabase {
    inner: MemoryDatabase,
    fail_on: usize,
    reads: AtomicUsize,
}

impl Database for FailingDatabase {
    type Transaction = MemoryTransaction;

    async fn transaction(&self, stores: &[&str]) -> StorageResult<MemoryTransaction> {
        let read = self.reads.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        if read == self.fail_on {
            return Err(StorageError::Unavailable("connection lost".into()));
        }
        self.inner.transaction(stores).await
    }

    async fn write_transaction(&self, stores: &[&str]) -> StorageResult<MemoryTransaction> {
        self.inner.write_transaction(stores).await
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Task `i + 1` gets `ranks[i]`; every third task is done
async fn seed_tasks(ranks: &[i64]) -> MemoryDatabase {
    let db = MemoryDatabase::new([IndexSchema::new("tasks", ["id"], ["rank"])]);
    let mut tx = db.write_transaction(&["tasks"]).await.unwrap();
    for (id, rank) in (1..).zip(ranks) {
        let state = if id % 3 == 0 { "done" } else { "open" };
        tx.put("tasks", json!({"id": id, "rank": rank, "state": state}))
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();
    db
}

fn resolver_over(db: MemoryDatabase, page_size: usize) -> TaskResolver {
    let config = RetrieveConfig::default().with_page_size(page_size);
    DatabaseRetrieveResolver::new(Arc::new(db), TaskSource::new(), config)
}

/// Tasks 1..=count; rank cycles through 0..ranks
async fn setup_tasks(count: i64, ranks: i64, page_size: usize) -> TaskResolver {
    let ranks: Vec<i64> = (1..=count).map(|id| (id * 7) % ranks).collect();
    resolver_over(seed_tasks(&ranks).await, page_size)
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

fn id_descending() -> Comparator<Task> {
    Arc::new(|a: &Task, b: &Task| b.id.cmp(&a.id))
}

fn rank_sort(ascending: bool) -> TaskQuery {
    TaskQuery::Rank(RetrieveQuery::Sort(SortQuery::new(ascending)))
}

fn rank_sort_with_fallback(ascending: bool) -> TaskQuery {
    TaskQuery::Rank(RetrieveQuery::Sort(
        SortQuery::new(ascending).with_fallback(id_descending()),
    ))
}

fn ids(tasks: &[Task]) -> Vec<i64> {
    tasks.iter().map(|t| t.id).collect()
}

fn transactions(resolver: &TaskResolver) -> usize {
    resolver.database().transactions_opened()
}

// =============================================================================
// Pagination
// =============================================================================

/// Every record is read exactly once for any page size.
#[tokio::test]
async fn test_pagination_is_complete_for_any_page_size() {
    for page_size in [1, 2, 3, 7, 10, 25, 100] {
        let resolver = setup_tasks(25, 4, page_size).await;
        let mut read = ids(&resolver.fetch_all(None, false).await.unwrap());
        read.sort_unstable();
        assert_eq!(read, (1..=25).collect::<Vec<_>>(), "page_size {}", page_size);
    }
}

/// A range holding exactly a multiple of the page size needs no trailing empty page.
#[tokio::test]
async fn test_offset_boundary_transaction_count() {
    for (count, expected) in [(20, 2), (21, 3), (0, 1)] {
        let resolver = setup_tasks(count, 4, 10).await;
        let before = transactions(&resolver);
        let tasks = resolver.fetch_all(None, false).await.unwrap();
        assert_eq!(tasks.len() as i64, count);
        assert_eq!(transactions(&resolver) - before, expected, "count {}", count);
    }
}

/// Pages are only read as the consumer pulls.
#[tokio::test]
async fn test_stream_is_lazy() {
    let resolver = setup_tasks(30, 4, 5).await;
    let before = transactions(&resolver);

    let stream = resolver.fetch(None, false).unwrap();
    assert_eq!(transactions(&resolver), before);

    let first: Vec<_> = stream.take(6).collect().await;
    assert_eq!(first.len(), 6);
    assert_eq!(transactions(&resolver) - before, 2);
}

// =============================================================================
// Ordering
// =============================================================================

/// Tie runs spanning page boundaries are still sorted by the fallback.
#[tokio::test]
async fn test_fallback_orders_runs_across_pages() {
    let resolver = setup_tasks(30, 3, 4).await;
    let tasks = resolver
        .fetch_all(Some(&rank_sort_with_fallback(true)), false)
        .await
        .unwrap();

    let mut expected = tasks.clone();
    expected.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| b.id.cmp(&a.id)));
    assert_eq!(ids(&tasks), ids(&expected));
    assert_eq!(tasks.len(), 30);
}

/// Descending rank scans mirror ascending ones.
#[tokio::test]
async fn test_direction_symmetry() {
    let resolver = setup_tasks(5, 100, 2).await;
    let ranks = |tasks: Vec<Task>| tasks.into_iter().map(|t| t.rank).collect::<Vec<_>>();

    let ascending = ranks(resolver.fetch_all(Some(&rank_sort(true)), false).await.unwrap());
    let descending = ranks(resolver.fetch_all(Some(&rank_sort(false)), false).await.unwrap());

    assert_eq!(ascending, vec![7, 14, 21, 28, 35]);
    let mut mirrored = descending.clone();
    mirrored.reverse();
    assert_eq!(mirrored, ascending);
}

/// Reversing the scan reverses the index order but not the fallback order of ties.
#[tokio::test]
async fn test_direction_symmetry_keeps_fallback_order() {
    let resolver = setup_tasks(12, 3, 5).await;
    let ascending = resolver
        .fetch_all(Some(&rank_sort_with_fallback(true)), false)
        .await
        .unwrap();
    let descending = resolver
        .fetch_all(Some(&rank_sort_with_fallback(false)), false)
        .await
        .unwrap();

    let ranks = |tasks: &[Task]| tasks.iter().map(|t| t.rank).collect::<Vec<_>>();
    let mut mirrored = ranks(&descending);
    mirrored.reverse();
    assert_eq!(mirrored, ranks(&ascending));

    for rank in 0..3 {
        let run = |tasks: &[Task]| {
            tasks
                .iter()
                .filter(|t| t.rank == rank)
                .map(|t| t.id)
                .collect::<Vec<_>>()
        };
        let in_ascending = run(&ascending);
        assert_eq!(in_ascending, run(&descending));
        assert!(in_ascending.windows(2).all(|pair| pair[0] > pair[1]));
    }
}

/// Streaming and materialized fetches return the same sequence.
#[tokio::test]
async fn test_streaming_and_materialized_agree() {
    let resolver = setup_tasks(23, 5, 4).await;
    let queries = [
        None,
        Some(rank_sort(true)),
        Some(rank_sort(false)),
        Some(rank_sort_with_fallback(true)),
        Some(rank_sort_with_fallback(false)),
        Some(TaskQuery::Rank(RetrieveQuery::Sort(
            SortQuery::new(true).from(1).to(3),
        ))),
        Some(TaskQuery::State(RetrieveQuery::filter("done".to_string()))),
    ];

    for query in queries.iter() {
        let streamed = resolver.fetch_all(query.as_ref(), false).await.unwrap();
        let materialized = resolver.fetch_all(query.as_ref(), true).await.unwrap();
        assert_eq!(ids(&streamed), ids(&materialized));
    }
}

/// Fetching twice yields the same records in the same order.
#[tokio::test]
async fn test_fetch_is_idempotent() {
    let resolver = setup_tasks(17, 3, 4).await;
    let query = rank_sort_with_fallback(false);
    let first = resolver.fetch_all(Some(&query), false).await.unwrap();
    let second = resolver.fetch_all(Some(&query), false).await.unwrap();
    assert_eq!(first, second);
}

// =============================================================================
// Filtering
// =============================================================================

/// Filters on fields without an index are applied in memory.
#[tokio::test]
async fn test_unindexed_filter_applies_in_memory() {
    let resolver = setup_tasks(10, 4, 3).await;
    let query = TaskQuery::State(RetrieveQuery::filter("done".to_string()));

    let done = resolver.fetch_all(Some(&query), false).await.unwrap();
    assert_eq!(ids(&done), vec![3, 6, 9]);
    assert!(done.iter().all(|t| t.state == "done"));

    let explain = resolver.explain(Some(&query), false);
    assert!(explain.post_filter);
}

/// Sorting on a field without an index is rejected before any read.
#[tokio::test]
async fn test_unindexed_sort_is_rejected() {
    let resolver = setup_tasks(10, 4, 3).await;
    let before = transactions(&resolver);
    let query = TaskQuery::State(RetrieveQuery::sort(true));

    let err = resolver.fetch(Some(&query), false).err().unwrap();
    assert_eq!(err.code(), RetrieveErrorCode::MarkQuerySortNotIndexed);
    assert_eq!(transactions(&resolver), before);
}

/// An inverted range is a malformed query.
#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let resolver = setup_tasks(10, 4, 3).await;
    let query = TaskQuery::Rank(RetrieveQuery::Sort(SortQuery::new(true).from(3).to(1)));
    let err = resolver.fetch(Some(&query), true).err().unwrap();
    assert_eq!(err.code(), RetrieveErrorCode::MarkQueryInvalid);
}

// =============================================================================
// Failures
// =============================================================================

/// A malformed stored entry yields one error item and the rest are still read.
#[tokio::test]
async fn test_malformed_entry_does_not_end_stream() {
    let resolver = setup_tasks(6, 4, 2).await;
    let mut tx = resolver.database().write_transaction(&["tasks"]).await.unwrap();
    tx.put("tasks", json!({"id": 4, "rank": 1})).await.unwrap();
    tx.commit().await.unwrap();

    let items: Vec<_> = resolver.fetch(None, false).unwrap().collect().await;
    assert_eq!(items.len(), 6);
    let failed: Vec<_> = items.iter().filter_map(|item| item.as_ref().err()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].code(), RetrieveErrorCode::MarkExtractionFailed);
}

/// Fallback comparators see only tie runs, so a reversed comparator still
/// respects the index order.
#[tokio::test]
async fn test_fallback_never_overrides_index_order() {
    let resolver = setup_tasks(12, 3, 5).await;
    let reversed: Comparator<Task> = Arc::new(|a: &Task, b: &Task| match a.rank.cmp(&b.rank) {
        Ordering::Equal => a.id.cmp(&b.id),
        other => other.reverse(),
    });
    let query = TaskQuery::Rank(RetrieveQuery::Sort(SortQuery::new(true).with_fallback(reversed)));
    let tasks = resolver.fetch_all(Some(&query), false).await.unwrap();
    assert!(tasks.windows(2).all(|pair| pair[0].rank <= pair[1].rank));
}

/// With a fallback sort, a storage failure still comes after every record read.
#[tokio::test]
async fn test_storage_failure_is_last_item_with_fallback() {
    let db = FailingDatabase {
        inner: seed_tasks(&[1; 6]).await,
        fail_on: 2,
        reads: AtomicUsize::new(0),
    };
    let config = RetrieveConfig::default().with_page_size(2);
    let resolver = DatabaseRetrieveResolver::new(Arc::new(db), TaskSource::new(), config);

    let cases = [
        (rank_sort_with_fallback(true), ["Ok(2)", "Ok(1)", "Err(MARK_STORAGE_FAILED)"]),
        (rank_sort(true), ["Ok(1)", "Ok(2)", "Err(MARK_STORAGE_FAILED)"]),
    ];
    for (query, expected) in cases {
        resolver.database().reads.store(0, AtomicOrdering::SeqCst);
        let items: Vec<_> = resolver.fetch(Some(&query), false).unwrap().collect().await;
        let shape: Vec<String> = items
            .iter()
            .map(|item| match item {
                Ok(task) => format!("Ok({})", task.id),
                Err(err) => format!("Err({})", err.code().code()),
            })
            .collect();
        assert_eq!(shape, expected);
    }
}

// =============================================================================
// Properties over random task sets
// =============================================================================

fn arb_ranks() -> impl Strategy<Value = Vec<i64>> {
    (1i64..6).prop_flat_map(|cardinality| prop::collection::vec(0..cardinality, 0..40))
}

/// Rank order, ties by descending id, reversed ranks when descending
fn reference_order(ranks: &[i64], ascending: bool) -> Vec<i64> {
    let mut tasks: Vec<(i64, i64)> = (1..).zip(ranks.iter().copied()).collect();
    tasks.sort_by(|a, b| {
        let by_rank = if ascending { a.1.cmp(&b.1) } else { b.1.cmp(&a.1) };
        by_rank.then_with(|| b.0.cmp(&a.0))
    });
    tasks.into_iter().map(|(id, _)| id).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_paging_reads_every_task_once(ranks in arb_ranks(), page_size in 1usize..12) {
        let mut read = block_on(async {
            let resolver = resolver_over(seed_tasks(&ranks).await, page_size);
            ids(&resolver.fetch_all(None, false).await.unwrap())
        });
        read.sort_unstable();
        prop_assert_eq!(read, (1..=ranks.len() as i64).collect::<Vec<_>>());
    }

    #[test]
    fn prop_fallback_orders_every_tie_run(
        ranks in arb_ranks(),
        page_size in 1usize..12,
        ascending in any::<bool>(),
    ) {
        let streamed = block_on(async {
            let resolver = resolver_over(seed_tasks(&ranks).await, page_size);
            let query = rank_sort_with_fallback(ascending);
            ids(&resolver.fetch_all(Some(&query), false).await.unwrap())
        });
        prop_assert_eq!(streamed, reference_order(&ranks, ascending));
    }

    #[test]
    fn prop_modes_agree_and_repeat(
        ranks in arb_ranks(),
        page_size in 1usize..12,
        ascending in any::<bool>(),
        with_fallback in any::<bool>(),
    ) {
        let (streamed, materialized, again) = block_on(async {
            let resolver = resolver_over(seed_tasks(&ranks).await, page_size);
            let query = if with_fallback {
                rank_sort_with_fallback(ascending)
            } else {
                rank_sort(ascending)
            };
            let streamed = resolver.fetch_all(Some(&query), false).await.unwrap();
            let materialized = resolver.fetch_all(Some(&query), true).await.unwrap();
            let again = resolver.fetch_all(Some(&query), false).await.unwrap();
            (ids(&streamed), ids(&materialized), ids(&again))
        });
        prop_assert_eq!(&streamed, &materialized);
        prop_assert_eq!(&streamed, &again);
    }
}
