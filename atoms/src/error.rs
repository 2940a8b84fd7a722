use thiserror::Error;

/// Error taxonomy for task and user operations.
///
/// Callers branch on the variant, never on message text. `Dependency` wraps
/// the failing collaborator's message for logs only.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Record absent or soft-deleted. Surfaced to the caller, not retried.
    #[error("not found")]
    NotFound,

    /// Malformed input field. Surfaced to the caller, not retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store/channel/registry call failed.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// Reminder dispatched twice; treated as success-no-op by callers.
    #[error("reminder already sent")]
    AlreadyProcessed,
}

impl TaskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        TaskError::Validation(msg.into())
    }

    pub fn dependency(msg: impl std::fmt::Display) -> Self {
        TaskError::Dependency(msg.to_string())
    }
}
