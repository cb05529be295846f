//! Integration tests for task store reconciliation.
//!
//! Runs the store against the in-memory collection and validates:
//! - Ordering and identifier uniqueness after every mutation
//! - Snapshot equals the in-memory list after every successful mutation
//! - No local mutation when the collection call fails
//! - Not-found failures never reach the network
//! - Snapshot fallback on fetch failure
//! - Subscribers never observe a half-applied change

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use todosync::cache::{MemoryStorage, SnapshotCache};
use todosync::remote::memory::InMemoryCollection;
use todosync::remote::RemoteError;
use todosync::store::{Refresh, StoreError, TaskStore};
use todosync_proto::task::is_newest_first;
use todosync_proto::{Filter, Task, TaskDraft, TaskId, TaskPatch};

type Store = TaskStore<InMemoryCollection, MemoryStorage>;

fn store_with(drafts: Vec<TaskDraft>) -> Store {
    TaskStore::new(
        InMemoryCollection::with_drafts(drafts),
        SnapshotCache::new(MemoryStorage::new()),
    )
}

fn draft(title: &str, ts: i64) -> TaskDraft {
    TaskDraft::new("userId 1", title).with_create_date(ts)
}

fn assert_consistent(store: &Store) {
    let tasks = store.tasks();
    assert!(is_newest_first(&tasks), "list out of order: {tasks:?}");
    let ids: HashSet<_> = tasks.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids.len(), tasks.len(), "duplicate ids: {tasks:?}");
    assert!(tasks.iter().all(Task::is_persisted));
    assert_eq!(store.cache().load(), *tasks, "snapshot diverged");
}

// =============================================================================
// Ordering and snapshot consistency
// =============================================================================

#[tokio::test]
async fn adds_keep_list_sorted_and_snapshotted() {
    let store = store_with(vec![]);
    store.fetch_all().await;

    for (title, ts) in [("Mid", 50), ("Newest", 90), ("Oldest", 10), ("Tie", 50)] {
        store.add(draft(title, ts)).await.unwrap();
        assert_consistent(&store);
    }

    let titles: Vec<_> = store.tasks().iter().map(|t| t.title.clone()).collect();
    // Equal timestamps: the later arrival was prepended, so it comes first.
    assert_eq!(titles, vec!["Newest", "Tie", "Mid", "Oldest"]);
}

#[tokio::test]
async fn every_mutation_kind_keeps_snapshot_equal() {
    let store = store_with(vec![draft("First task", 1), draft("Second task", 2)]);
    store.fetch_all().await;
    assert_consistent(&store);

    let added = store.add(draft("Third task", 3)).await.unwrap();
    assert_consistent(&store);

    let id = added.id.clone().unwrap();
    store.update(&id, TaskPatch::title("Third, renamed")).await.unwrap();
    assert_consistent(&store);

    store.toggle_complete(&TaskId::new("1")).await.unwrap();
    assert_consistent(&store);

    store.remove(&TaskId::new("2")).await.unwrap();
    assert_consistent(&store);
    assert_eq!(store.tasks().len(), 2);
}

// =============================================================================
// Round-trip properties
// =============================================================================

#[tokio::test]
async fn complete_then_reopen_restores_task() {
    let store = store_with(vec![draft("Water plants", 7)]);
    store.fetch_all().await;
    let id = TaskId::new("1");
    let original = store.find(&id).unwrap();

    store.update(&id, TaskPatch::completed(true)).await.unwrap();
    let restored = store.update(&id, TaskPatch::completed(false)).await.unwrap();
    assert_eq!(restored, original);
    assert_eq!(store.find(&id).unwrap(), original);
}

#[tokio::test]
async fn double_toggle_restores_completed_flag() {
    let store = store_with(vec![draft("Call mom", 7).with_completed(true)]);
    store.fetch_all().await;
    let id = TaskId::new("1");

    assert!(!store.toggle_complete(&id).await.unwrap().completed);
    assert!(store.toggle_complete(&id).await.unwrap().completed);
    assert_eq!(store.remote().calls().update, 2);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn unknown_id_update_makes_no_network_call() {
    let store = store_with(vec![draft("Only task", 1)]);
    store.fetch_all().await;
    let before = store.remote().calls();

    let err = store
        .update(&TaskId::new("missing"), TaskPatch::completed(true))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref id) if id.as_str() == "missing"));

    let err = store.toggle_complete(&TaskId::new("missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    assert_eq!(store.remote().calls(), before);
}

#[tokio::test]
async fn failed_mutations_leave_state_untouched() {
    let store = store_with(vec![draft("Stable task", 1)]);
    store.fetch_all().await;
    let before = store.tasks();
    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let _sub = store.subscribe(move |_| *counter.lock() += 1);

    store.remote().set_offline(true);
    let id = TaskId::new("1");
    assert!(matches!(
        store.add(draft("New task", 5)).await,
        Err(StoreError::Remote(RemoteError::Unavailable(_)))
    ));
    assert!(store.update(&id, TaskPatch::title("Changed")).await.is_err());
    assert!(store.toggle_complete(&id).await.is_err());
    assert!(store.remove(&id).await.is_err());

    assert_eq!(store.tasks(), before);
    assert_eq!(store.cache().load(), *before);
    // Only the immediate delivery on subscribe.
    assert_eq!(*seen.lock(), 1);
}

#[tokio::test]
async fn fetch_failure_with_snapshot_restores_it() {
    let storage = MemoryStorage::new();
    let first = TaskStore::new(
        InMemoryCollection::with_drafts([draft("Persisted A", 2), draft("Persisted B", 1)]),
        SnapshotCache::new(storage),
    );
    first.fetch_all().await;
    let snapshot = first.cache().load();
    assert_eq!(snapshot.len(), 2);

    // A new session whose collection is down but whose storage holds the snapshot.
    let restarted_cache = SnapshotCache::new(MemoryStorage::new());
    restarted_cache.save(&snapshot);
    let restarted = TaskStore::new(InMemoryCollection::new(), restarted_cache);
    restarted.remote().set_offline(true);

    match restarted.fetch_all().await {
        Refresh::Recovered {
            tasks,
            from_snapshot,
            error,
        } => {
            assert!(from_snapshot);
            assert_eq!(*tasks, snapshot);
            assert!(matches!(error, RemoteError::Unavailable(_)));
        }
        Refresh::Fresh(_) => panic!("offline fetch reported fresh data"),
    }
    assert_eq!(*restarted.tasks(), snapshot);
}

#[tokio::test]
async fn fetch_failure_without_snapshot_is_empty() {
    let store = store_with(vec![draft("Unreachable", 1)]);
    store.remote().set_offline(true);
    let refresh = store.fetch_all().await;
    assert!(refresh.is_recovered());
    assert!(refresh.tasks().is_empty());
    assert!(store.tasks().is_empty());
}

#[tokio::test]
async fn fetch_failure_with_empty_snapshot_keeps_current_list() {
    let store = store_with(vec![draft("Loaded once", 1)]);
    store.fetch_all().await;
    store.cache().save(&[]);
    store.remote().set_offline(true);

    let refresh = store.fetch_all().await;
    assert!(matches!(refresh, Refresh::Recovered { from_snapshot: false, .. }));
    assert_eq!(store.tasks().len(), 1);
}

#[tokio::test]
async fn broken_storage_never_surfaces() {
    let store = store_with(vec![draft("Still works", 1)]);
    store.cache().storage().set_failing(true);

    assert!(!store.fetch_all().await.is_recovered());
    store.add(draft("Added anyway", 2)).await.unwrap();
    assert_eq!(store.tasks().len(), 2);
    assert!(store.cache().load().is_empty());
}

// =============================================================================
// Filter
// =============================================================================

#[tokio::test]
async fn filter_changes_make_no_network_calls() {
    let store = store_with(vec![
        draft("Done task", 2).with_completed(true),
        draft("Open task", 1),
    ]);
    store.fetch_all().await;
    let before = store.remote().calls();

    for filter in Filter::ALL {
        store.set_filter(filter);
        assert_eq!(store.filter(), filter);
        assert!(store.filtered().iter().all(|t| filter.matches(t)));
    }
    assert_eq!(store.remote().calls(), before);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn overlapping_adds_both_land() {
    let store = Arc::new(store_with(vec![]));
    let a = Arc::clone(&store);
    let b = Arc::clone(&store);

    let (ra, rb) = tokio::join!(
        async move { a.add(draft("From A", 10)).await },
        async move { b.add(draft("From B", 20)).await },
    );
    ra.unwrap();
    rb.unwrap();

    assert_eq!(store.tasks().len(), 2);
    assert_consistent(&store);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_on_multithreaded_runtime() {
    let store = Arc::new(store_with(vec![]));
    let observed = Arc::new(Mutex::new(Vec::<Arc<Vec<Task>>>::new()));
    let sink = Arc::clone(&observed);
    let _sub = store.subscribe(move |tasks| sink.lock().push(Arc::clone(tasks)));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add(draft(&format!("Task {i}"), i % 5)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.tasks().len(), 16);
    assert_consistent(&store);

    // Every delivered list is a complete commit: sorted, ids assigned, and
    // one task longer than the one before it.
    let observed = observed.lock();
    assert_eq!(observed.len(), 17);
    for (n, list) in observed.iter().enumerate() {
        assert_eq!(list.len(), n);
        assert!(is_newest_first(list));
        assert!(list.iter().all(Task::is_persisted));
    }
}

#[tokio::test]
async fn update_racing_remove_does_not_resurrect_task() {
    let store = Arc::new(store_with(vec![draft("Contested", 1)]));
    store.fetch_all().await;
    let id = TaskId::new("1");

    let (updater, remover) = (Arc::clone(&store), Arc::clone(&store));
    let (uid, rid) = (id.clone(), id.clone());
    let (updated, removed) = tokio::join!(
        async move { updater.update(&uid, TaskPatch::completed(true)).await },
        async move { remover.remove(&rid).await },
    );
    removed.unwrap();
    // The update may land on the server before or after the delete; either
    // way the local list must not bring the task back.
    if let Err(err) = updated {
        assert!(matches!(err, StoreError::Remote(ref e) if e.is_not_found()));
    }
    assert!(store.find(&id).is_none());
    assert_consistent(&store);
}
