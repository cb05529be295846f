//! Task store: the in-memory task list kept consistent with the remote
//! collection and mirrored into the local snapshot.
//!
//! Every mutation is write-through. The remote call happens first; only
//! when it succeeds is the result reconciled into memory (one atomic commit)
//! and then written to the snapshot. On failure the in-memory list is left
//! exactly as it was and the error goes back to the caller. Reads fall back
//! to the snapshot when the collection is unreachable.

pub mod observable;

pub use observable::{Observable, Subscription};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use todosync_proto::task::sort_newest_first;
use todosync_proto::{Filter, Task, TaskDraft, TaskId, TaskPatch, ValidationError};

use crate::cache::{KeyValueStore, SnapshotCache};
use crate::remote::{CollectionClient, RemoteError};
use crate::view::{self, Stats};

/// Errors surfaced by task store mutations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No task with this identifier is in the local list.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The remote collection call failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The task is missing a required field.
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
}

/// Outcome of [`TaskStore::fetch_all`].
#[derive(Debug)]
pub enum Refresh {
    /// The collection answered; the list is current.
    Fresh(Arc<Vec<Task>>),
    /// The collection failed and the store recovered locally.
    Recovered {
        /// The in-memory list after recovery.
        tasks: Arc<Vec<Task>>,
        /// Whether the list was restored from the local snapshot.
        from_snapshot: bool,
        /// Why the collection call failed.
        error: RemoteError,
    },
}

impl Refresh {
    /// The list subscribers now see.
    #[must_use]
    pub const fn tasks(&self) -> &Arc<Vec<Task>> {
        match self {
            Self::Fresh(tasks) | Self::Recovered { tasks, .. } => tasks,
        }
    }

    /// Returns `true` if the collection call failed.
    #[must_use]
    pub const fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

/// Current time in whole seconds since the Unix epoch.
#[must_use]
pub fn now_secs() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    )
    .unwrap_or(i64::MAX)
}

/// Owns the task list and the active filter.
///
/// The list is always sorted newest first and identifiers are unique
/// within it. All methods take `&self`; share the store behind an `Arc`
/// to issue calls from several tasks at once. Overlapping calls reconcile
/// in the order their remote responses arrive.
pub struct TaskStore<C: CollectionClient, S: KeyValueStore> {
    remote: C,
    cache: SnapshotCache<S>,
    tasks: Observable<Arc<Vec<Task>>>,
    filter: Observable<Filter>,
    clock: fn() -> i64,
}

impl<C: CollectionClient, S: KeyValueStore> TaskStore<C, S> {
    /// Creates a store with an empty list and [`Filter::All`].
    ///
    /// Call [`fetch_all`](Self::fetch_all) to load the collection.
    pub fn new(remote: C, cache: SnapshotCache<S>) -> Self {
        Self {
            remote,
            cache,
            tasks: Observable::new(Arc::new(Vec::new())),
            filter: Observable::new(Filter::All),
            clock: now_secs,
        }
    }

    /// Replaces the clock used to stamp new tasks.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// The remote collection client.
    pub const fn remote(&self) -> &C {
        &self.remote
    }

    /// The local snapshot cache.
    pub const fn cache(&self) -> &SnapshotCache<S> {
        &self.cache
    }

    /// Current task list, newest first.
    pub fn tasks(&self) -> Arc<Vec<Task>> {
        self.tasks.get()
    }

    /// Current task with this identifier, if loaded.
    pub fn find(&self, id: &TaskId) -> Option<Task> {
        self.tasks.get().iter().find(|t| t.has_id(id)).cloned()
    }

    /// Current list narrowed by the active filter.
    pub fn filtered(&self) -> Vec<Task> {
        let filter = self.filter();
        self.tasks
            .get()
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Counters over the full list.
    pub fn stats(&self) -> Stats {
        view::stats(&self.tasks.get())
    }

    /// The active filter.
    pub fn filter(&self) -> Filter {
        self.filter.get()
    }

    /// Replaces the active filter. No network call is made.
    pub fn set_filter(&self, filter: Filter) {
        tracing::debug!(%filter, "filter changed");
        self.filter.set(filter);
    }

    /// Registers a listener for the task list. It receives the current
    /// list immediately and every committed change afterwards.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Arc<Vec<Task>>) + Send + Sync + 'static,
    {
        self.tasks.subscribe(listener)
    }

    /// Registers a listener for the active filter.
    pub fn subscribe_filter<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Filter) + Send + Sync + 'static,
    {
        self.filter.subscribe(listener)
    }

    /// Loads the full collection.
    ///
    /// On success the list is sorted newest first, replaces the in-memory
    /// list and is written to the snapshot. On failure the snapshot is read
    /// instead: a non-empty snapshot replaces the in-memory list, an empty
    /// one leaves it unchanged. Never fails; see [`Refresh`].
    pub async fn fetch_all(&self) -> Refresh {
        match self.remote.list().await {
            Ok(mut tasks) => {
                sort_newest_first(&mut tasks);
                let count = tasks.len();
                let tasks = self.commit(|_| tasks);
                tracing::debug!(count, "task list fetched");
                Refresh::Fresh(tasks)
            }
            Err(error) => {
                tracing::warn!(error = %error, "fetching tasks failed, falling back to snapshot");
                let snapshot = self.cache.load();
                let from_snapshot = !snapshot.is_empty();
                let tasks = if from_snapshot {
                    tracing::info!(count = snapshot.len(), "restored task list from snapshot");
                    self.tasks.update(|list| {
                        *list = Arc::new(snapshot);
                        Arc::clone(list)
                    })
                } else {
                    self.tasks()
                };
                Refresh::Recovered {
                    tasks,
                    from_snapshot,
                    error,
                }
            }
        }
    }

    /// Fetches one task from the collection, falling back to the in-memory
    /// list if the collection cannot be reached.
    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        match self.remote.get(id).await {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(task_id = %id, error = %error, "fetching task failed, using local copy");
                self.find(id)
            }
        }
    }

    /// Creates a task.
    ///
    /// Stamps `create_date` with the current time if the draft has none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] before any network call if the
    /// draft is missing required fields, or [`StoreError::Remote`] if the
    /// create request fails. The local list is unchanged on error.
    pub async fn add(&self, mut draft: TaskDraft) -> Result<Task, StoreError> {
        draft.validate()?;
        if draft.create_date.is_none() {
            draft.create_date = Some((self.clock)());
        }

        let created = self.remote.create(&draft).await.inspect_err(|error| {
            tracing::warn!(error = %error, "creating task failed");
        })?;
        let Some(id) = created.id.clone() else {
            tracing::warn!("collection created a task without an id");
            return Err(RemoteError::MissingId.into());
        };

        self.commit(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(created.clone());
            next.extend(current.iter().filter(|t| !t.has_id(&id)).cloned());
            sort_newest_first(&mut next);
            next
        });
        tracing::debug!(task_id = %id, "task added");
        Ok(created)
    }

    /// Edits a task by merging `patch` over the local copy and sending the
    /// full merged task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] without any network call if the
    /// identifier is not in the local list, [`StoreError::Validation`] if
    /// the merged task is invalid, or [`StoreError::Remote`] if the update
    /// request fails. The local list is unchanged on error.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let current = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let merged = patch.apply(&current);
        merged.validate()?;

        let mut updated = self.remote.update(id, &merged).await.inspect_err(|error| {
            tracing::warn!(task_id = %id, error = %error, "updating task failed");
        })?;
        if updated.id.is_none() {
            updated.id = Some(id.clone());
        }

        self.commit(|current| {
            let mut next = current.to_vec();
            match next.iter_mut().find(|t| t.has_id(id)) {
                Some(slot) => *slot = updated.clone(),
                None => {
                    tracing::debug!(task_id = %id, "task left the list while its update was in flight");
                }
            }
            sort_newest_first(&mut next);
            next
        });
        tracing::debug!(task_id = %id, "task updated");
        Ok(updated)
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Remote`] if the delete request fails; the local
    /// list is unchanged in that case.
    pub async fn remove(&self, id: &TaskId) -> Result<(), StoreError> {
        self.remote.delete(id).await.inspect_err(|error| {
            tracing::warn!(task_id = %id, error = %error, "deleting task failed");
        })?;

        self.commit(|current| current.iter().filter(|t| !t.has_id(id)).cloned().collect());
        tracing::debug!(task_id = %id, "task removed");
        Ok(())
    }

    /// Flips the completion flag of a task.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn toggle_complete(&self, id: &TaskId) -> Result<Task, StoreError> {
        let current = self
            .find(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        self.update(id, TaskPatch::completed(!current.completed))
            .await
    }

    /// Replaces the list with `next(current)`, writes the snapshot and
    /// notifies subscribers, all as one commit.
    fn commit(&self, next: impl FnOnce(&[Task]) -> Vec<Task>) -> Arc<Vec<Task>> {
        self.tasks.update(|list| {
            let replacement = Arc::new(next(list.as_slice()));
            self.cache.save(&replacement);
            *list = Arc::clone(&replacement);
            replacement
        })
    }
}
