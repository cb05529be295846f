//! Shared wire model for the `todosync` task collection.

pub mod codec;
pub mod task;

pub use task::{Filter, Task, TaskDraft, TaskId, TaskPatch, ValidationError};
