//! Transport interface.
//!
//! The session engine only sees [`Transport`]. It provides two independent
//! channels (primary game channel and chat channel) with blocking receives and
//! best-effort sends. [`tcp::TcpTransport`] is the stock implementation.

pub mod tcp;

pub use tcp::TcpTransport;

use thiserror::Error;

use crate::protocol::Message;

/// Transport failures.
///
/// Dispatchers do not tell these apart from a clean close: any of them ends the
/// session.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("transport has been closed")]
    Closed,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client side of the two server channels.
///
/// Shared by the main thread (sends, close) and both dispatcher threads
/// (receives), so every method takes `&self`.
pub trait Transport: Send + Sync {
    /// Open both channels.
    fn connect(&self) -> Result<(), TransportError>;

    /// Block for the next primary-channel message. `Ok(None)` means the channel closed.
    fn receive(&self) -> Result<Option<Message>, TransportError>;

    /// Block for the next chat-channel message. `Ok(None)` means the channel closed.
    fn receive_chat(&self) -> Result<Option<Message>, TransportError>;

    /// Fire-and-forget send on the primary channel. A failed send shows up as the
    /// next receive reporting closure.
    fn send_message(&self, message: &Message);

    /// Fire-and-forget send on the chat channel.
    fn send_chat(&self, message: &Message);

    /// Release both channels and wake any blocked receive. Idempotent.
    fn close(&self);
}
