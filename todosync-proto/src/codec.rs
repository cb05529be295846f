//! JSON encoding for task lists.
//!
//! The local snapshot uses the same text format as the collection's
//! `GET /collection` response body.

use crate::task::Task;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Encodes a task list as a JSON array.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the list cannot be serialized.
pub fn encode_tasks(tasks: &[Task]) -> Result<String, CodecError> {
    Ok(serde_json::to_string(tasks)?)
}

/// Decodes a JSON array into a task list, preserving element order.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the text is not a JSON array of
/// tasks.
pub fn decode_tasks(text: &str) -> Result<Vec<Task>, CodecError> {
    Ok(serde_json::from_str(text)?)
}
