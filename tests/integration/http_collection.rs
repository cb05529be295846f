//! Integration tests for the HTTP collection client against the collection
//! server.
//!
//! Starts the server in-process on an OS-assigned port and validates:
//! - REST status codes and JSON bodies of the server
//! - `HttpCollectionClient` CRUD round trips
//! - A task store driven over real HTTP
//! - Snapshot fallback when the collection is unreachable

use std::time::Duration;

use todosync::cache::{FileStorage, MemoryStorage, SnapshotCache};
use todosync::remote::http::HttpCollectionClient;
use todosync::remote::{CollectionClient, RemoteError};
use todosync::store::{Refresh, TaskStore};
use todosync_proto::{Task, TaskDraft, TaskId, TaskPatch};

/// Start the collection server in-process and return the collection URL.
async fn start_collection() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = todosync_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start collection server");
    (format!("http://{addr}/todos"), handle)
}

/// A URL on which nothing is listening.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/todos")
}

fn client(url: &str) -> HttpCollectionClient {
    HttpCollectionClient::new(url, Duration::from_secs(5)).unwrap()
}

fn draft(title: &str, ts: i64) -> TaskDraft {
    TaskDraft::new("userId 1", title).with_create_date(ts)
}

// =============================================================================
// Server protocol
// =============================================================================

#[tokio::test]
async fn server_status_codes() {
    let (url, _handle) = start_collection().await;
    let http = reqwest::Client::new();

    let created = http.post(&url).json(&draft("Buy milk", 100)).send().await.unwrap();
    assert_eq!(created.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = created.json().await.unwrap();
    assert_eq!(body["id"], "1");
    assert_eq!(body["userId"], "userId 1");
    assert_eq!(body["createDate"], 100);

    let invalid = http.post(&url).json(&draft("ab", 1)).send().await.unwrap();
    assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = invalid.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("title"));

    let missing_owner = http
        .post(&url)
        .json(&serde_json::json!({ "title": "Buy milk" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_owner.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = missing_owner.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("userId"));

    let not_json = http
        .put(format!("{url}/1"))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = not_json.json().await.unwrap();
    assert!(body["error"].is_string());

    let deleted = http.delete(format!("{url}/1")).send().await.unwrap();
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let gone = http.get(format!("{url}/1")).send().await.unwrap();
    assert_eq!(gone.status(), reqwest::StatusCode::NOT_FOUND);

    let again = http.delete(format!("{url}/1")).send().await.unwrap();
    assert_eq!(again.status(), reqwest::StatusCode::NOT_FOUND);
}

// =============================================================================
// Client round trips
// =============================================================================

#[tokio::test]
async fn client_crud_round_trip() {
    let (url, _handle) = start_collection().await;
    let c = client(&url);

    assert!(c.list().await.unwrap().is_empty());

    let a = c.create(&draft("First task", 1)).await.unwrap();
    let b = c.create(&draft("Second task", 2)).await.unwrap();
    assert_eq!(a.id, Some(TaskId::new("1")));
    assert_eq!(b.id, Some(TaskId::new("2")));

    let fetched = c.get(&TaskId::new("2")).await.unwrap();
    assert_eq!(fetched, Some(b.clone()));

    let edited = Task {
        completed: true,
        ..b.clone()
    };
    let stored = c.update(&TaskId::new("2"), &edited).await.unwrap();
    assert_eq!(stored, edited);

    c.delete(&TaskId::new("1")).await.unwrap();
    assert_eq!(c.list().await.unwrap(), vec![edited]);
}

#[tokio::test]
async fn client_maps_missing_tasks() {
    let (url, _handle) = start_collection().await;
    let c = client(&url);
    let id = TaskId::new("404");

    assert_eq!(c.get(&id).await.unwrap(), None);

    let ghost = Task::from_draft(id.clone(), draft("Ghost task", 1));
    let err = c.update(&id, &ghost).await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {err}");

    let err = c.delete(&id).await.unwrap_err();
    assert!(matches!(err, RemoteError::Status { method: "DELETE", status: 404, .. }));
}

#[tokio::test]
async fn client_reports_unreachable_collection() {
    let c = client(&dead_url().await);
    let err = c.list().await.unwrap_err();
    assert!(matches!(err, RemoteError::Transport { .. }), "unexpected error: {err}");
}

// =============================================================================
// Task store over HTTP
// =============================================================================

#[tokio::test]
async fn store_over_http() {
    let (url, _handle) = start_collection().await;
    let store = TaskStore::new(client(&url), SnapshotCache::new(MemoryStorage::new()));

    assert!(!store.fetch_all().await.is_recovered());
    let older = store.add(draft("Older task", 10)).await.unwrap();
    let newer = store.add(draft("Newer task", 20)).await.unwrap();
    assert_eq!(*store.tasks(), vec![newer.clone(), older.clone()]);

    let newer_id = newer.id.clone().unwrap();
    let toggled = store.toggle_complete(&newer_id).await.unwrap();
    assert!(toggled.completed);

    let older_id = older.id.clone().unwrap();
    store
        .update(&older_id, TaskPatch::title("Older, renamed"))
        .await
        .unwrap();
    assert_eq!(store.get(&older_id).await.unwrap().title, "Older, renamed");

    store.remove(&newer_id).await.unwrap();

    // A fresh fetch agrees with the locally reconciled list.
    let local = store.tasks();
    let Refresh::Fresh(remote) = store.fetch_all().await else {
        panic!("collection should be reachable");
    };
    assert_eq!(remote, local);
    assert_eq!(store.cache().load(), *local);
}

#[tokio::test]
async fn snapshot_survives_collection_outage() {
    let dir = std::env::temp_dir().join(format!("todosync-http-{}", std::process::id()));
    let (url, _handle) = start_collection().await;

    let online = TaskStore::new(client(&url), SnapshotCache::new(FileStorage::new(&dir)));
    online.fetch_all().await;
    online.add(draft("Survives outage", 5)).await.unwrap();
    let expected = online.tasks();

    // Next session: same snapshot directory, collection unreachable.
    let offline = TaskStore::new(
        client(&dead_url().await),
        SnapshotCache::new(FileStorage::new(&dir)),
    );
    let refresh = offline.fetch_all().await;
    assert!(matches!(refresh, Refresh::Recovered { from_snapshot: true, .. }));
    assert_eq!(offline.tasks(), expected);

    // Reads fall back to the local copy; writes still fail.
    let id = TaskId::new("1");
    assert_eq!(offline.get(&id).await.unwrap().title, "Survives outage");
    assert!(offline.remove(&id).await.is_err());
    assert_eq!(offline.tasks(), expected);

    let _ = std::fs::remove_dir_all(dir);
}
