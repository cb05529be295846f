//! In-memory task collection backing the REST endpoints.
//!
//! The [`CollectionStore`] keeps tasks in insertion order and assigns
//! sequential decimal identifiers starting at `"1"`. Identifiers are never
//! reused, even after a delete.

use tokio::sync::RwLock;
use todosync_proto::{Task, TaskDraft, TaskId};

/// Default maximum number of stored tasks.
const DEFAULT_MAX_TASKS: usize = 10_000;

/// Errors from collection mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// No task with this identifier exists.
    #[error("task {0} not found")]
    NotFound(TaskId),

    /// The collection already holds the maximum number of tasks.
    #[error("collection is full ({0} tasks)")]
    Full(usize),
}

struct Inner {
    tasks: Vec<Task>,
    next_id: u64,
}

/// Thread-safe in-memory task collection.
pub struct CollectionStore {
    inner: RwLock<Inner>,
    max_tasks: usize,
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionStore {
    /// Creates an empty collection with the default size limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_tasks(DEFAULT_MAX_TASKS)
    }

    /// Creates an empty collection holding at most `max_tasks` tasks.
    #[must_use]
    pub fn with_max_tasks(max_tasks: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                tasks: Vec::new(),
                next_id: 1,
            }),
            max_tasks,
        }
    }

    /// All tasks in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        self.inner.read().await.tasks.clone()
    }

    /// The task with this identifier, if any.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        let inner = self.inner.read().await;
        inner.tasks.iter().find(|t| t.has_id(id)).cloned()
    }

    /// Stores `draft` under a fresh identifier and returns the new task.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::Full`] if the size limit is reached.
    pub async fn create(&self, draft: TaskDraft) -> Result<Task, CollectionError> {
        let mut inner = self.inner.write().await;
        if inner.tasks.len() >= self.max_tasks {
            return Err(CollectionError::Full(self.max_tasks));
        }
        let id = TaskId::new(inner.next_id.to_string());
        inner.next_id += 1;
        let task = Task::from_draft(id, draft);
        inner.tasks.push(task.clone());
        drop(inner);
        Ok(task)
    }

    /// Replaces the task stored under `id`, keeping `id` whatever the body
    /// says.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NotFound`] if no such task exists.
    pub async fn replace(&self, id: &TaskId, task: Task) -> Result<Task, CollectionError> {
        let mut inner = self.inner.write().await;
        let slot = inner
            .tasks
            .iter_mut()
            .find(|t| t.has_id(id))
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;
        *slot = Task {
            id: Some(id.clone()),
            ..task
        };
        Ok(slot.clone())
    }

    /// Deletes the task stored under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionError::NotFound`] if no such task exists.
    pub async fn remove(&self, id: &TaskId) -> Result<(), CollectionError> {
        let mut inner = self.inner.write().await;
        let position = inner
            .tasks
            .iter()
            .position(|t| t.has_id(id))
            .ok_or_else(|| CollectionError::NotFound(id.clone()))?;
        inner.tasks.remove(position);
        Ok(())
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    /// Returns `true` if no tasks are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tasks.is_empty()
    }
}
