//! Application state: turns user intents into task store calls and collects
//! the notifications to show for them.
//!
//! Every successful mutation is followed by a full refresh from the
//! collection so the displayed list cannot drift from the server. A failed
//! toggle refreshes too, to put the checkbox back where the server has it.

use todosync_proto::{Filter, Task, TaskDraft, TaskId, TaskPatch};

use crate::cache::KeyValueStore;
use crate::remote::CollectionClient;
use crate::store::{Refresh, StoreError, TaskStore};
use crate::view::{Page, Stats, ViewState};

/// A message for the user about the outcome of an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The action succeeded.
    Success(String),
    /// The action failed.
    Error(String),
}

impl Notification {
    /// Message text.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::Error(m) => m,
        }
    }

    /// Returns `true` for failures.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(m) => write!(f, "{m}"),
            Self::Error(m) => write!(f, "error: {m}"),
        }
    }
}

/// Main application state.
pub struct App<C: CollectionClient, S: KeyValueStore> {
    store: TaskStore<C, S>,
    view: ViewState,
    default_owner: String,
    notifications: Vec<Notification>,
}

impl<C: CollectionClient, S: KeyValueStore> App<C, S> {
    /// Create an application around `store`.
    pub fn new(store: TaskStore<C, S>, view: ViewState, default_owner: impl Into<String>) -> Self {
        Self {
            store,
            view,
            default_owner: default_owner.into(),
            notifications: Vec::new(),
        }
    }

    /// The underlying task store.
    pub const fn store(&self) -> &TaskStore<C, S> {
        &self.store
    }

    /// Current view parameters.
    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    /// Owner id used when a new task names none.
    pub fn default_owner(&self) -> &str {
        &self.default_owner
    }

    /// Builds a draft for a new task, falling back to the default owner.
    pub fn draft(&self, title: impl Into<String>, owner: Option<String>, completed: bool) -> TaskDraft {
        let owner = owner.unwrap_or_else(|| self.default_owner.clone());
        TaskDraft::new(owner, title).with_completed(completed)
    }

    /// Initial load. Only reports anything if the collection was unreachable.
    pub async fn load(&mut self) -> Refresh {
        let refresh = self.store.fetch_all().await;
        self.report_recovery(&refresh);
        refresh
    }

    /// User-requested reload from the collection.
    pub async fn refresh(&mut self) -> Refresh {
        let refresh = self.store.fetch_all().await;
        if !refresh.is_recovered() {
            self.notify_success("Tasks refreshed successfully");
        }
        self.report_recovery(&refresh);
        refresh
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording a notification for it.
    pub async fn add(&mut self, draft: TaskDraft) -> Result<Task, StoreError> {
        match self.store.add(draft).await {
            Ok(task) => {
                self.notify_success("Task added successfully");
                self.resync().await;
                Ok(task)
            }
            Err(err) => {
                self.notify_error(format!("Failed to add task: {err}"));
                Err(err)
            }
        }
    }

    /// Edits a task.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording a notification for it.
    pub async fn edit(&mut self, id: &TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        match self.store.update(id, patch).await {
            Ok(task) => {
                self.notify_success("Task updated successfully");
                self.resync().await;
                Ok(task)
            }
            Err(err) => {
                self.notify_error(format!("Failed to update task: {err}"));
                Err(err)
            }
        }
    }

    /// Flips a task between completed and pending.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording a notification for it. The
    /// list is refreshed either way.
    pub async fn toggle(&mut self, id: &TaskId) -> Result<Task, StoreError> {
        let result = self.store.toggle_complete(id).await;
        match &result {
            Ok(task) => {
                let state = if task.completed { "completed" } else { "pending" };
                self.notify_success(format!("Task marked as {state}"));
            }
            Err(err) => self.notify_error(format!("Failed to update task: {err}")),
        }
        self.resync().await;
        result
    }

    /// Deletes a task.
    ///
    /// # Errors
    ///
    /// Returns the store error after recording a notification for it.
    pub async fn delete(&mut self, id: &TaskId) -> Result<(), StoreError> {
        match self.store.remove(id).await {
            Ok(()) => {
                self.notify_success("Task deleted successfully");
                self.resync().await;
                Ok(())
            }
            Err(err) => {
                self.notify_error(format!("Failed to delete task: {err}"));
                Err(err)
            }
        }
    }

    /// Changes the completion filter and returns to page 1.
    pub fn set_filter(&mut self, filter: Filter) {
        self.store.set_filter(filter);
        self.view.on_filter_changed();
    }

    /// Changes the search text and returns to page 1.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.view.set_search(search);
    }

    /// Moves to another page.
    pub fn set_page_index(&mut self, page_index: usize) {
        self.view.set_page_index(page_index);
    }

    /// Changes the page size and returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.view.set_page_size(page_size);
    }

    /// The page currently on screen.
    pub fn page(&self) -> Page {
        self.view.project(&self.store.tasks(), self.store.filter())
    }

    /// Counters over the whole list.
    pub fn stats(&self) -> Stats {
        self.store.stats()
    }

    /// Pending notifications, oldest first. Drains the queue.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    async fn resync(&mut self) {
        let refresh = self.store.fetch_all().await;
        self.report_recovery(&refresh);
    }

    fn report_recovery(&mut self, refresh: &Refresh) {
        match refresh {
            Refresh::Fresh(_) => {}
            Refresh::Recovered {
                from_snapshot: true,
                ..
            } => self.notify_error("Failed to load tasks; showing local snapshot"),
            Refresh::Recovered { error, .. } => {
                self.notify_error(format!("Failed to load tasks: {error}"));
            }
        }
    }

    fn notify_success(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Success(message.into()));
    }

    fn notify_error(&mut self, message: impl Into<String>) {
        self.notifications.push(Notification::Error(message.into()));
    }
}

/// Renders a creation timestamp relative to `now` (both in seconds):
/// "Just now", "N mins ago", "N hours ago", "N days ago", or the local
/// calendar date once a week has passed.
#[must_use]
pub fn format_age(create_date: i64, now: i64) -> String {
    let elapsed = now.saturating_sub(create_date);
    let mins = elapsed.div_euclid(60);
    let hours = elapsed.div_euclid(3_600);
    let days = elapsed.div_euclid(86_400);

    if mins < 1 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{mins} {} ago", plural(mins, "min"))
    } else if hours < 24 {
        format!("{hours} {} ago", plural(hours, "hour"))
    } else if days < 7 {
        format!("{days} {} ago", plural(days, "day"))
    } else {
        format_date(create_date)
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n > 1 { format!("{unit}s") } else { unit.to_string() }
}

fn format_date(secs: i64) -> String {
    use chrono::{Local, TimeZone};
    match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d").to_string(),
        _ => secs.to_string(),
    }
}
