//! Background channel dispatchers.
//!
//! Each channel is drained by its own thread running [`drive`] with a
//! [`ChannelHandler`]:
//!
//! ```text
//!   loop while session.running && session.connected
//!     receive ──▶ Some(msg) ──▶ handler.handle(msg) ──▶ Ok ──▶ next
//!        │                                  │
//!        │ None / Err                       │ Err (bad payload)
//!        ▼                                  ▼
//!     channel lost: connected = false, running = false,
//!                   renderer.shutdown(), exit
//! ```
//!
//! A dispatcher only notices shutdown between receives. If a receive fails after
//! shutdown was already requested, `connected` is still cleared but the loop
//! exits quietly, without a warning or a renderer notification.

pub mod chat;
pub mod game;

pub use chat::ChatDispatcher;
pub use game::MessageDispatcher;

use tracing::{debug, warn};

use crate::protocol::{Message, ProtocolError};
use crate::state::Session;
use crate::transport::TransportError;

/// Why a dispatcher loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchExit {
    /// `running` or `connected` was already false.
    Stopped,
    /// This dispatcher saw its channel fail and ended the session.
    ChannelLost,
}

/// One channel's receive and apply steps.
pub trait ChannelHandler {
    /// Channel name for logs and thread names.
    const CHANNEL: &'static str;

    fn session(&self) -> &Session;

    fn receive(&self) -> Result<Option<Message>, TransportError>;

    /// Apply one message. An error ends the session like a lost channel.
    fn handle(&self, message: &Message) -> Result<(), ProtocolError>;
}

/// Run `handler` until the session stops or its channel fails.
pub fn drive<H: ChannelHandler>(handler: &H) -> DispatchExit {
    let session = handler.session();
    debug!(channel = H::CHANNEL, "dispatcher started");

    let exit = loop {
        if !session.is_live() {
            break DispatchExit::Stopped;
        }

        let failure = match handler.receive() {
            Ok(Some(message)) => {
                debug!(channel = H::CHANNEL, kind = %message.kind(), "received");
                match handler.handle(&message) {
                    Ok(()) => continue,
                    Err(e) => e.to_string(),
                }
            }
            Ok(None) => "channel closed".to_string(),
            Err(e) => e.to_string(),
        };

        if !session.is_running() {
            debug!(channel = H::CHANNEL, reason = %failure, "receive ended during shutdown");
            session.mark_connection_lost();
            break DispatchExit::Stopped;
        }

        warn!(channel = H::CHANNEL, reason = %failure, "connection to server lost");
        session.mark_connection_lost();
        session.renderer().with(|r| r.shutdown());
        break DispatchExit::ChannelLost;
    };

    debug!(channel = H::CHANNEL, ?exit, "dispatcher stopped");
    exit
}
