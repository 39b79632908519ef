//! Error types for Ripple operations.

use thiserror::Error;

/// Errors that can occur in Ripple operations.
///
/// Validation and conflict outcomes are separate variants so callers can
/// turn each one into its own user-facing message.
#[derive(Error, Debug)]
pub enum RippleError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A user with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("A user with username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("User '{user_id}' is already registered for event '{event_id}'")]
    AlreadyRegistered { user_id: String, event_id: String },

    #[error("Event '{0}' is full")]
    EventFull(String),

    #[error("Event not found: {0}")]
    EventNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No registration of user '{user_id}' for event '{event_id}'")]
    RegistrationNotFound { user_id: String, event_id: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mirror error: {0}")]
    Mirror(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RippleError {
    /// True for outcomes caused by existing data (duplicates, capacity)
    /// rather than by bad input or a broken store.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RippleError::DuplicateEmail(_)
                | RippleError::DuplicateUsername(_)
                | RippleError::AlreadyRegistered { .. }
                | RippleError::EventFull(_)
        )
    }
}

/// Result type alias for Ripple operations.
pub type RippleResult<T> = Result<T, RippleError>;
