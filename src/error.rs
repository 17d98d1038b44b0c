//! Error types for the kanban board.

use crate::store::StoreError;

/// Top-level error type for the board, its task API and the task store.
#[derive(Debug, thiserror::Error)]
pub enum KanbanError {
    /// The referenced task no longer exists.
    #[error("task not found: {0}")]
    NotFound(String),

    /// The task was rejected before reaching the store (e.g. empty title).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Network or server failure on a task API call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store detected a concurrent update on a record that still exists.
    #[error("concurrency conflict: {0}")]
    Conflict(String),

    /// Task store error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Reminder scheduling error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KanbanError {
    /// Returns `true` for failures that leave local board state untrusted
    /// and require a full reload.
    pub fn requires_reload(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Transport(_) | Self::Conflict(_) | Self::Store(_)
        )
    }
}

impl From<StoreError> for KanbanError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id.to_string()),
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::Conflict(id) => Self::Conflict(format!("task {id} was modified concurrently")),
            other => Self::Store(other.to_string()),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, KanbanError>;
