//! Chat channel dispatcher.

use std::sync::Arc;

use tracing::{debug, info};

use crate::protocol::{now_timestamp, ChatEvent, Message, ProtocolError};
use crate::state::Session;
use crate::transport::{Transport, TransportError};

use super::{drive, ChannelHandler, DispatchExit};

/// Drains the chat channel and forwards lines to the renderer.
pub struct ChatDispatcher {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
}

impl ChatDispatcher {
    pub fn new(session: Arc<Session>, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    pub fn run(&self) -> DispatchExit {
        drive(self)
    }
}

impl ChannelHandler for ChatDispatcher {
    const CHANNEL: &'static str = "chat";

    fn session(&self) -> &Session {
        &self.session
    }

    fn receive(&self) -> Result<Option<Message>, TransportError> {
        self.transport.receive_chat()
    }

    fn handle(&self, message: &Message) -> Result<(), ProtocolError> {
        match ChatEvent::decode(message)? {
            ChatEvent::Line { text, timestamp } => {
                // Lines without a server timestamp are stamped on arrival
                let timestamp = timestamp.unwrap_or_else(now_timestamp);
                info!(%text, timestamp, "chat");
                self.session
                    .renderer()
                    .with(|r| r.display_chat(&text, timestamp));
            }
            ChatEvent::Ignored(kind) => debug!(%kind, "ignoring chat message"),
        }
        Ok(())
    }
}
