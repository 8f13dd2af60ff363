//! Defines the errors of the server layer.

pub use transport::errors::{BuildError, DisconnectError, DisconnectReason};

/// Describes the errors that can occur while building a server configuration.
#[derive(Debug, PartialEq, Eq, Clone, thiserror::Error)]
pub enum ConfigError {
    /// No factory for the application side of channels was given.
    #[error("no channel handler was configured")]
    MissingChannelHandler,
    /// A service name was registered more than once.
    #[error("service {0:?} was registered twice")]
    DuplicateService(String),
    /// The transport configuration was invalid.
    #[error(transparent)]
    Transport(#[from] BuildError),
}

/// The application side of a channel is gone.
#[derive(Debug, PartialEq, Eq, Clone, Copy, thiserror::Error)]
#[error("the channel was closed")]
pub struct ChannelClosed;
