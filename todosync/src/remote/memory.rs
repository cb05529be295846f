//! In-process task collection for testing.
//!
//! [`InMemoryCollection`] behaves like the REST collection: it assigns
//! sequential string identifiers on create, replaces whole tasks on update
//! and answers 404-style errors for unknown identifiers. It also records how
//! many calls each operation received and can be switched offline to
//! simulate transport failures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use todosync_proto::{Task, TaskDraft, TaskId};

use super::{CollectionClient, RemoteError};

/// Per-operation call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `list` calls.
    pub list: usize,
    /// `get` calls.
    pub get: usize,
    /// `create` calls.
    pub create: usize,
    /// `update` calls.
    pub update: usize,
    /// `delete` calls.
    pub delete: usize,
}

impl CallCounts {
    /// Sum of all calls.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.list + self.get + self.create + self.update + self.delete
    }
}

#[derive(Default)]
struct Counters {
    list: AtomicUsize,
    get: AtomicUsize,
    create: AtomicUsize,
    update: AtomicUsize,
    delete: AtomicUsize,
}

struct Collection {
    tasks: Vec<Task>,
    next_id: u64,
}

/// In-memory task collection implementing [`CollectionClient`].
///
/// Every call yields to the runtime once before answering, so concurrent
/// callers interleave the way they would against a real server.
pub struct InMemoryCollection {
    collection: Mutex<Collection>,
    offline: AtomicBool,
    counters: Counters,
}

impl Default for InMemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCollection {
    /// Creates an empty, online collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collection: Mutex::new(Collection {
                tasks: Vec::new(),
                next_id: 1,
            }),
            offline: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Creates a collection pre-populated with `drafts`, in order.
    #[must_use]
    pub fn with_drafts(drafts: impl IntoIterator<Item = TaskDraft>) -> Self {
        let collection = Self::new();
        {
            let mut inner = collection.collection.lock();
            for draft in drafts {
                let id = Self::next_id(&mut inner);
                inner.tasks.push(Task::from_draft(id, draft));
            }
        }
        collection
    }

    /// Switch the collection offline (`true`) or back online.
    ///
    /// While offline every call fails with [`RemoteError::Unavailable`]
    /// and leaves the stored tasks untouched.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        CallCounts {
            list: self.counters.list.load(Ordering::SeqCst),
            get: self.counters.get.load(Ordering::SeqCst),
            create: self.counters.create.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
        }
    }

    /// Copy of the stored tasks in insertion order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.collection.lock().tasks.clone()
    }

    fn next_id(inner: &mut Collection) -> TaskId {
        let id = TaskId::new(inner.next_id.to_string());
        inner.next_id += 1;
        id
    }

    /// Count the call, suspend once, then fail if offline.
    async fn enter(&self, counter: &AtomicUsize) -> Result<(), RemoteError> {
        counter.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(
                "in-memory collection is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn not_found(method: &'static str, id: &TaskId) -> RemoteError {
        RemoteError::Status {
            method,
            url: format!("memory:///todos/{id}"),
            status: 404,
        }
    }
}

impl CollectionClient for InMemoryCollection {
    async fn list(&self) -> Result<Vec<Task>, RemoteError> {
        self.enter(&self.counters.list).await?;
        Ok(self.tasks())
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, RemoteError> {
        self.enter(&self.counters.get).await?;
        let inner = self.collection.lock();
        Ok(inner.tasks.iter().find(|t| t.has_id(id)).cloned())
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, RemoteError> {
        self.enter(&self.counters.create).await?;
        let mut inner = self.collection.lock();
        let id = Self::next_id(&mut inner);
        let task = Task::from_draft(id, draft.clone());
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn update(&self, id: &TaskId, task: &Task) -> Result<Task, RemoteError> {
        self.enter(&self.counters.update).await?;
        let mut inner = self.collection.lock();
        let slot = inner
            .tasks
            .iter_mut()
            .find(|t| t.has_id(id))
            .ok_or_else(|| Self::not_found("PUT", id))?;
        *slot = Task {
            id: Some(id.clone()),
            ..task.clone()
        };
        Ok(slot.clone())
    }

    async fn delete(&self, id: &TaskId) -> Result<(), RemoteError> {
        self.enter(&self.counters.delete).await?;
        let mut inner = self.collection.lock();
        let before = inner.tasks.len();
        inner.tasks.retain(|t| !t.has_id(id));
        if inner.tasks.len() == before {
            return Err(Self::not_found("DELETE", id));
        }
        Ok(())
    }
}
