//! Task model shared by the collection client and the collection server.
//!
//! A [`Task`] travels as JSON with camelCase field names (`id`, `userId`,
//! `title`, `completed`, `createDate`). The identifier is assigned by the
//! collection on creation, so drafts ([`TaskDraft`]) carry no `id` at all
//! and a persisted task always has `id: Some(..)`.

use std::cmp::Reverse;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimum task title length in characters (after trimming).
pub const MIN_TITLE_LENGTH: usize = 3;

/// Identifier assigned to a task by the remote collection.
///
/// Opaque to clients; the reference server hands out sequential decimal
/// strings but any string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A to-do item as stored in the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Collection-assigned identifier. `None` until the task is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<TaskId>,
    /// Owner identifier.
    pub user_id: String,
    /// Short description, at least [`MIN_TITLE_LENGTH`] characters.
    pub title: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation time in whole seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
}

impl Task {
    /// Builds a persisted task from a draft and the identifier the
    /// collection assigned to it.
    #[must_use]
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id: Some(id),
            user_id: draft.user_id,
            title: draft.title,
            completed: draft.completed,
            create_date: draft.create_date,
        }
    }

    /// Returns the fields of this task without its identifier.
    #[must_use]
    pub fn to_draft(&self) -> TaskDraft {
        TaskDraft {
            user_id: self.user_id.clone(),
            title: self.title.clone(),
            completed: self.completed,
            create_date: self.create_date,
        }
    }

    /// Whether the collection has assigned this task an identifier.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Returns `true` when this task carries the given identifier.
    #[must_use]
    pub fn has_id(&self, id: &TaskId) -> bool {
        self.id.as_ref() == Some(id)
    }

    /// Sort key used for list ordering: missing timestamps count as 0.
    #[must_use]
    pub fn sort_timestamp(&self) -> i64 {
        self.create_date.unwrap_or(0)
    }

    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// See [`validate_fields`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.user_id)
    }
}

/// Body of a create request: a task that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    /// Owner identifier.
    pub user_id: String,
    /// Short description.
    pub title: String,
    /// Completion flag.
    #[serde(default)]
    pub completed: bool,
    /// Creation time in whole seconds; stamped by the client when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
}

impl TaskDraft {
    /// Creates a pending draft with no creation timestamp.
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            completed: false,
            create_date: None,
        }
    }

    /// Sets the completion flag.
    #[must_use]
    pub const fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Sets an explicit creation timestamp (seconds since epoch).
    #[must_use]
    pub const fn with_create_date(mut self, create_date: i64) -> Self {
        self.create_date = Some(create_date);
        self
    }

    /// Checks the required fields.
    ///
    /// # Errors
    ///
    /// See [`validate_fields`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.title, &self.user_id)
    }
}

/// A partial edit. `None` fields keep the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    /// New owner identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    /// New creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<i64>,
}

impl TaskPatch {
    /// A patch that only changes the completion flag.
    #[must_use]
    pub const fn completed(completed: bool) -> Self {
        Self {
            user_id: None,
            title: None,
            completed: Some(completed),
            create_date: None,
        }
    }

    /// A patch that only changes the title.
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.title.is_none()
            && self.completed.is_none()
            && self.create_date.is_none()
    }

    /// Returns a copy of `task` with this patch merged over it.
    ///
    /// The identifier is never touched.
    #[must_use]
    pub fn apply(&self, task: &Task) -> Task {
        Task {
            id: task.id.clone(),
            user_id: self.user_id.clone().unwrap_or_else(|| task.user_id.clone()),
            title: self.title.clone().unwrap_or_else(|| task.title.clone()),
            completed: self.completed.unwrap_or(task.completed),
            create_date: self.create_date.or(task.create_date),
        }
    }
}

/// Completion filter applied when deriving the displayed list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Every task.
    #[default]
    All,
    /// Only tasks with `completed == true`.
    Completed,
    /// Only tasks with `completed == false`.
    Pending,
}

impl Filter {
    /// Every filter value, in display order.
    pub const ALL: [Self; 3] = [Self::All, Self::Completed, Self::Pending];

    /// Returns `true` if `task` passes this filter.
    #[must_use]
    pub const fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.completed,
            Self::Pending => !task.completed,
        }
    }

    /// Lowercase name used on the command line and in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Completed => "completed",
            Self::Pending => "pending",
        }
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown filter name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter `{0}` (expected all, completed or pending)")]
pub struct ParseFilterError(String);

impl FromStr for Filter {
    type Err = ParseFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "completed" | "done" => Ok(Self::Completed),
            "pending" | "open" => Ok(Self::Pending),
            _ => Err(ParseFilterError(s.to_string())),
        }
    }
}

/// Required-field violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Title is shorter than [`MIN_TITLE_LENGTH`] characters.
    #[error("title must be at least {MIN_TITLE_LENGTH} characters")]
    TitleTooShort,
    /// Owner identifier is blank.
    #[error("owner id is required")]
    OwnerMissing,
}

/// Checks the fields every task must carry.
///
/// # Errors
///
/// Returns [`ValidationError::TitleTooShort`] if the trimmed title has fewer
/// than [`MIN_TITLE_LENGTH`] characters, or [`ValidationError::OwnerMissing`]
/// if the owner id is blank.
pub fn validate_fields(title: &str, user_id: &str) -> Result<(), ValidationError> {
    if title.trim().chars().count() < MIN_TITLE_LENGTH {
        return Err(ValidationError::TitleTooShort);
    }
    if user_id.trim().is_empty() {
        return Err(ValidationError::OwnerMissing);
    }
    Ok(())
}

/// Sorts tasks newest first by creation timestamp.
///
/// The sort is stable: tasks with equal (or missing) timestamps keep their
/// relative order.
pub fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by_key(|t| Reverse(t.sort_timestamp()));
}

/// Returns `true` if `tasks` is ordered newest first.
#[must_use]
pub fn is_newest_first(tasks: &[Task]) -> bool {
    tasks
        .windows(2)
        .all(|pair| pair[0].sort_timestamp() >= pair[1].sort_timestamp())
}
