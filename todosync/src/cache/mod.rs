//! Local snapshot of the last known-good task list.
//!
//! The snapshot keeps the list view populated across a transient outage of
//! the remote collection. It is strictly best-effort:
//! 1. Write failures are logged and swallowed, never surfaced.
//! 2. A missing, unreadable or undecodable snapshot reads as an empty list.
//! 3. Contexts without durable storage use [`NoStorage`], where writes are
//!    dropped and reads find nothing.
//!
//! Storage backends implement the small [`KeyValueStore`] trait.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::{MemoryStorage, NoStorage};

use std::path::PathBuf;

use todosync_proto::Task;
use todosync_proto::codec::{decode_tasks, encode_tasks};

/// Key the snapshot is stored under unless configured otherwise.
pub const SNAPSHOT_KEY: &str = "todos";

/// Errors that can occur in a key-value storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend is full or not available in this context.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The key cannot be used by this backend.
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),

    /// A filesystem operation failed.
    #[error("storage I/O error at {path}: {source}")]
    Io {
        /// Path that was accessed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// String key-value storage scoped to this device.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// Serializes task lists into a [`KeyValueStore`] under a fixed key.
pub struct SnapshotCache<S: KeyValueStore> {
    storage: S,
    key: String,
}

impl<S: KeyValueStore> SnapshotCache<S> {
    /// Create a cache using the default [`SNAPSHOT_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, SNAPSHOT_KEY)
    }

    /// Create a cache storing its snapshot under `key`.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// The backing storage.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The key the snapshot is stored under.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist `tasks` as the current snapshot.
    ///
    /// Failures are logged and swallowed.
    pub fn save(&self, tasks: &[Task]) {
        let text = match encode_tasks(tasks) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "snapshot encode failed");
                return;
            }
        };
        match self.storage.set(&self.key, &text) {
            Ok(()) => tracing::trace!(key = %self.key, count = tasks.len(), "snapshot saved"),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "snapshot save failed");
            }
        }
    }

    /// Read the last snapshot, or an empty list if there is none.
    ///
    /// Storage and decode failures are logged and read as empty.
    #[must_use]
    pub fn load(&self) -> Vec<Task> {
        match self.storage.get(&self.key) {
            Ok(Some(text)) => decode_tasks(&text).unwrap_or_else(|err| {
                tracing::warn!(key = %self.key, error = %err, "snapshot is unreadable");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "snapshot load failed");
                Vec::new()
            }
        }
    }
}
