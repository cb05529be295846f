//! Integration tests for the application layer over a live collection.
//!
//! Validates the user-facing flow: notifications per action, refresh after
//! mutations, filter/search/pagination over the reconciled list, and the
//! snapshot notice when the collection goes away.

use std::time::Duration;

use todosync::app::{App, Notification};
use todosync::cache::{MemoryStorage, SnapshotCache};
use todosync::remote::http::HttpCollectionClient;
use todosync::store::TaskStore;
use todosync::view::ViewState;
use todosync_proto::{Filter, TaskId, TaskPatch};

type HttpApp = App<HttpCollectionClient, MemoryStorage>;

async fn start_app() -> (HttpApp, tokio::task::JoinHandle<()>) {
    let (addr, handle) = todosync_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start collection server");
    let remote =
        HttpCollectionClient::new(&format!("http://{addr}/todos"), Duration::from_secs(5)).unwrap();
    let store = TaskStore::new(remote, SnapshotCache::new(MemoryStorage::new()));
    (App::new(store, ViewState::new(), "userId 1"), handle)
}

fn successes(notes: &[Notification]) -> Vec<&str> {
    notes
        .iter()
        .filter(|n| !n.is_error())
        .map(Notification::message)
        .collect()
}

#[tokio::test]
async fn full_session() {
    let (mut app, _handle) = start_app().await;
    assert!(!app.load().await.is_recovered());
    assert!(app.take_notifications().is_empty());

    for (ts, title) in (100..).zip(["Buy milk", "Call mom", "Walk the dog", "Buy bread"]) {
        let draft = app.draft(title, None, false).with_create_date(ts);
        app.add(draft).await.unwrap();
    }
    app.toggle(&TaskId::new("2")).await.unwrap();
    app.edit(&TaskId::new("3"), TaskPatch::title("Walk the dogs"))
        .await
        .unwrap();
    app.delete(&TaskId::new("1")).await.unwrap();

    let notes = app.take_notifications();
    assert_eq!(
        successes(&notes),
        vec![
            "Task added successfully",
            "Task added successfully",
            "Task added successfully",
            "Task added successfully",
            "Task marked as completed",
            "Task updated successfully",
            "Task deleted successfully",
        ]
    );
    assert!(notes.iter().all(|n| !n.is_error()));

    let titles: Vec<_> = app.page().items.into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Buy bread", "Walk the dogs", "Call mom"]);

    let stats = app.stats();
    assert_eq!((stats.total, stats.completed, stats.pending), (3, 1, 2));

    app.set_filter(Filter::Pending);
    app.set_search("BUY");
    let page = app.page();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Buy bread");
}

#[tokio::test]
async fn pagination_over_live_collection() {
    let (mut app, _handle) = start_app().await;
    app.load().await;
    for i in 0..12 {
        let draft = app.draft(format!("Task number {i}"), None, false).with_create_date(i);
        app.add(draft).await.unwrap();
    }

    app.set_page_index(3);
    let page = app.page();
    assert_eq!(page.total, 12);
    assert_eq!(page.items.len(), 2);
    // Newest first, so the last page holds the two oldest.
    assert_eq!(page.items[0].title, "Task number 1");
    assert_eq!(page.items[1].title, "Task number 0");

    app.set_page_size(10);
    assert_eq!(app.view().page_index(), 1);
    assert_eq!(app.page().items.len(), 10);
}

#[tokio::test]
async fn invalid_input_is_reported_not_sent() {
    let (mut app, _handle) = start_app().await;
    app.load().await;

    assert!(app.add(app.draft("no", None, false)).await.is_err());
    assert!(app.add(app.draft("Valid title", Some("  ".into()), false)).await.is_err());

    let notes = app.take_notifications();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(Notification::is_error));
    assert_eq!(app.stats().total, 0);
}

#[tokio::test]
async fn outage_falls_back_to_snapshot() {
    let (mut app, handle) = start_app().await;
    app.load().await;
    app.add(app.draft("Keep me visible", None, false)).await.unwrap();
    app.take_notifications();

    handle.abort();
    let _ = handle.await;
    // Fresh connections are refused once the listener is gone; pooled
    // keep-alive connections may still answer, so allow either outcome.
    let refresh = app.refresh().await;
    assert_eq!(app.page().total, 1);
    if refresh.is_recovered() {
        let notes = app.take_notifications();
        assert!(notes[0].is_error());
    }
}
