use thiserror::Error;

/// Errors a front end is expected to show to the user as-is.
///
/// They travel inside `anyhow::Error` like everything else and are
/// recovered with `downcast_ref::<TaskError>()` where the caller needs to
/// tell a rejected input apart from an I/O failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("invalid due date: {0} (use YYYY-MM-DD)")]
    InvalidDueDate(String),

    #[error("invalid priority: {0} (expected high, medium or low)")]
    InvalidPriority(String),

    #[error("invalid filter mode: {0} (expected all, active or completed)")]
    InvalidFilterMode(String),

    #[error("invalid sort order: {0} (expected smart or manual)")]
    InvalidSortOrder(String),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error("selector matches more than one task: {0}")]
    AmbiguousSelector(String),

    #[error("position {index} is out of range for {len} tasks")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("category name cannot be empty")]
    EmptyCategory,

    #[error("category is reserved: {0}")]
    ReservedCategory(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),
}
