//! Client error types.

use thiserror::Error;

use crate::state::InvalidTransition;
use crate::transport::TransportError;

/// Errors surfaced to whoever drives the client.
///
/// Protocol rejections and command guard failures are not errors; they are logged
/// and absorbed where they happen.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Initial connect failed.
    #[error("failed to connect to the server: {0}")]
    ConnectFailed(#[source] TransportError),

    /// The player declined to supply an identity.
    #[error("no player id entered")]
    MissingIdentity,

    /// A channel went away while the main thread was still driving the session.
    #[error("connection to the server was lost")]
    ConnectionLost,

    /// A dispatcher thread could not be started.
    #[error("failed to start dispatcher thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// Phase machine rejected an operation.
    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// Configuration could not be loaded.
    #[error("configuration error: {reason}")]
    Config {
        /// What went wrong.
        reason: String,
    },
}

impl ClientError {
    /// Returns true if the session cannot continue after this error.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::ConnectFailed(_)
            | Self::MissingIdentity
            | Self::ConnectionLost
            | Self::Spawn(_)
            | Self::Config { .. } => true,

            // The rejected operation is skipped; the session carries on
            Self::Transition(_) => false,
        }
    }
}
