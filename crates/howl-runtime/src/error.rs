//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use howl_framework::RegistryError;

/// Errors that can occur while starting or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating the configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A command could not be registered.
    #[error("Command registration failed: {0}")]
    Registry(#[from] RegistryError),

    /// The runtime was built without an outbound messenger.
    #[error("No messenger configured")]
    MissingMessenger,

    /// The HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The metrics recorder could not be installed.
    #[error("Metrics recorder error: {0}")]
    Metrics(String),

    /// Listening for shutdown signals failed.
    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
