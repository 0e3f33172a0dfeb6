//! Error types for the Howl framework.

use thiserror::Error;

/// Errors raised while building a [`CommandRegistry`](crate::CommandRegistry).
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// Two commands claim the same trigger (compared case-insensitively).
    #[error("trigger '{0}' is already registered")]
    DuplicateTrigger(String),

    /// A trigger is empty or contains whitespace.
    #[error("invalid trigger '{0}': must be non-empty and contain no whitespace")]
    InvalidTrigger(String),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
