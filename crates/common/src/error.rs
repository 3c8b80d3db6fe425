//! Error types for warden.

use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Caller Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    // === Operator-facing Faults ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Remote action failed: {0}")]
    RemoteAction(String),

    #[error("Notification delivery failed: {0}")]
    Notification(String),

    #[error("Unexpected state: {0}")]
    UnexpectedState(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Fault classes that the moderation core distinguishes when capturing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The infraction store was unreachable or a query failed.
    DataAccess,
    /// A platform enforcement call was rejected or failed.
    RemoteAction,
    /// Input was rejected before any side effect.
    Validation,
    /// An event or state the core does not know how to handle.
    UnexpectedState,
    /// Anything else (delivery, queueing, configuration).
    Other,
}

impl AppError {
    /// Returns the error code used in fault reports.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::RemoteAction(_) => "REMOTE_ACTION_ERROR",
            Self::Notification(_) => "NOTIFICATION_ERROR",
            Self::UnexpectedState(_) => "UNEXPECTED_STATE",
            Self::Queue(_) => "QUEUE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the fault class of this error.
    #[must_use]
    pub const fn fault_kind(&self) -> FaultKind {
        match self {
            Self::Database(_) => FaultKind::DataAccess,
            Self::RemoteAction(_) => FaultKind::RemoteAction,
            Self::Validation(_) => FaultKind::Validation,
            Self::UnexpectedState(_) => FaultKind::UnexpectedState,
            Self::NotFound(_)
            | Self::Notification(_)
            | Self::Queue(_)
            | Self::Config(_)
            | Self::Internal(_) => FaultKind::Other,
        }
    }

    /// Returns whether this error should be surfaced to operators at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        !matches!(
            self,
            Self::NotFound(_) | Self::Validation(_) | Self::Notification(_)
        )
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_mapping() {
        assert_eq!(
            AppError::Database("timeout".to_string()).fault_kind(),
            FaultKind::DataAccess
        );
        assert_eq!(
            AppError::RemoteAction("missing permission".to_string()).fault_kind(),
            FaultKind::RemoteAction
        );
        assert_eq!(
            AppError::UnexpectedState("channel_update".to_string()).fault_kind(),
            FaultKind::UnexpectedState
        );
        assert_eq!(
            AppError::Queue("full".to_string()).fault_kind(),
            FaultKind::Other
        );
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::Database("down".to_string()).is_server_error());
        assert!(AppError::RemoteAction("403".to_string()).is_server_error());
        assert!(!AppError::Validation("reason too long".to_string()).is_server_error());
        assert!(!AppError::Notification("dm closed".to_string()).is_server_error());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::RemoteAction("ban rejected".to_string());
        assert_eq!(err.to_string(), "Remote action failed: ban rejected");
        assert_eq!(err.error_code(), "REMOTE_ACTION_ERROR");
    }
}
