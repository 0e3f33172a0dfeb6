//! Error types for the Howl core.
//!
//! [`CommandError`] is the failure taxonomy a command may report; the
//! dispatcher picks a recovery path from its variant. The remaining types
//! describe failures of the collaborators the core talks to.

use std::time::Duration;

use thiserror::Error;

use crate::event::{ChannelId, CommunityId, MessageId};

/// A boxed, thread-safe error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Command Errors
// =============================================================================

/// Failures a command execution can end with.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A known, expected user mistake. The message is shown to the user.
    #[error("{0}")]
    UserFriendly(String),

    /// A game or domain invariant the user's action violated.
    #[error("{0}")]
    IllegalState(String),

    /// The storage layer rejected an operation.
    #[error("storage unavailable")]
    StorageUnavailable(#[source] BoxError),

    /// Anything else, programming defects included.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl CommandError {
    /// Creates a user-friendly error.
    pub fn user_friendly(message: impl Into<String>) -> Self {
        Self::UserFriendly(message.into())
    }

    /// Creates an illegal-state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Wraps a storage failure.
    pub fn storage(err: impl Into<BoxError>) -> Self {
        Self::StorageUnavailable(err.into())
    }

    /// Short name of the failure kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserFriendly(_) => "user_friendly",
            Self::IllegalState(_) => "illegal_state",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::Unclassified(_) => "unclassified",
        }
    }
}

impl From<MessagingError> for CommandError {
    fn from(err: MessagingError) -> Self {
        Self::Unclassified(anyhow::Error::new(err))
    }
}

// =============================================================================
// Messaging Errors
// =============================================================================

/// Errors raised by outbound messaging.
#[derive(Debug, Clone, Error)]
pub enum MessagingError {
    /// The bot may not post in or manage the channel.
    #[error("missing permission in channel {channel}")]
    MissingPermission { channel: ChannelId },

    /// The message no longer exists.
    #[error("unknown message {message} in channel {channel}")]
    UnknownMessage {
        channel: ChannelId,
        message: MessageId,
    },

    /// The platform asked us to slow down.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// The connection to the platform failed.
    #[error("transport error: {0}")]
    Transport(String),
}

// =============================================================================
// Invite Errors
// =============================================================================

/// Errors raised while resolving a support invite.
#[derive(Debug, Clone, Error)]
pub enum InviteError {
    /// The bot may not create invites in the community.
    #[error("missing permission to create invites in community {community}")]
    MissingPermission { community: CommunityId },

    /// The platform rejected the request.
    #[error("invite request failed: {0}")]
    Api(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for command execution.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Result type for outbound messaging.
pub type MessagingResult<T> = Result<T, MessagingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_kind_names() {
        assert_eq!(CommandError::user_friendly("x").kind(), "user_friendly");
        assert_eq!(CommandError::illegal_state("x").kind(), "illegal_state");
        assert_eq!(
            CommandError::storage(std::io::Error::other("down")).kind(),
            "storage_unavailable"
        );
    }

    #[test]
    fn test_unclassified_displays_outermost_context() {
        let result: anyhow::Result<()> = Err(std::io::Error::other("disk on fire"))
            .context("could not load game");
        let err = CommandError::from(result.unwrap_err());
        assert_eq!(err.kind(), "unclassified");
        assert_eq!(err.to_string(), "could not load game");
    }
}
