/*
[INPUT]:  Error sources (task capacity, file format, waypoint resolution, IO)
[OUTPUT]: Structured error types for task planner operations
[POS]:    Error handling layer - unified error types for the planner crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for task planner operations
#[derive(Error, Debug)]
pub enum TaskError {
    /// Insert attempted while every task slot is occupied
    #[error("Too many waypoints in task")]
    TaskFull,

    /// Waypoint requested for removal is not part of the task
    #[error("Waypoint {waypoint} is not in the current task")]
    WaypointNotInTask { waypoint: i32 },

    /// Task file is truncated, has a bad magic number or a bad field
    #[error("Task file format error: {0}")]
    FileFormat(String),

    /// Task file references a waypoint that could not be resolved
    #[error("Task file references unknown waypoint {index}")]
    InvalidWaypoint { index: i32 },

    /// Filesystem error while reading or writing a task file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic replacement of the task file failed
    #[error("Failed to persist task file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl TaskError {
    /// Check if the error came from reading a malformed task file
    pub fn is_file_error(&self) -> bool {
        matches!(
            self,
            TaskError::FileFormat(_) | TaskError::InvalidWaypoint { .. }
        )
    }

    pub fn format(message: impl Into<String>) -> Self {
        TaskError::FileFormat(message.into())
    }
}

/// Result type alias for task planner operations
pub type Result<T> = std::result::Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_errors_are_classified() {
        assert!(TaskError::format("bad magic").is_file_error());
        assert!(TaskError::InvalidWaypoint { index: 42 }.is_file_error());
        assert!(!TaskError::TaskFull.is_file_error());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(TaskError::TaskFull.to_string(), "Too many waypoints in task");
        assert_eq!(
            TaskError::WaypointNotInTask { waypoint: 7 }.to_string(),
            "Waypoint 7 is not in the current task"
        );
    }
}
