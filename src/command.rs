//! Outbound commands from the main thread.
//!
//! Every command is a guard followed by a send. A failed guard is logged and
//! reported as a [`CommandOutcome`]; it never produces an error and never touches
//! the network.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::protocol::{now_timestamp, Message, Timestamp};
use crate::state::{MoveBlocked, Session};
use crate::transport::Transport;

/// What happened to a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Handed to the transport
    Sent,
    /// Not connected (or shutting down)
    NotConnected,
    /// No player id yet
    NoIdentity,
    /// Spectators cannot move
    Spectator,
    /// The game is over; moves are closed
    GameOver,
    /// Not valid in the current phase
    WrongPhase,
    /// The player quit; nothing was sent and the session is torn down
    Quit,
}

impl CommandOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Synchronous command path used by the UI.
#[derive(Clone)]
pub struct CommandIssuer {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
}

impl CommandIssuer {
    pub fn new(session: Arc<Session>, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    /// Ask the server to seat this player (in the selected game, if any).
    pub fn join_lobby(&self) -> CommandOutcome {
        if !self.connected("join lobby") {
            return CommandOutcome::NotConnected;
        }
        let Some(player_id) = self.session.player_id() else {
            warn!("cannot join lobby: no player id");
            return CommandOutcome::NoIdentity;
        };
        self.send(Message::join_lobby(player_id))
    }

    /// Watch `game_id`. The session takes the spectator role right away.
    pub fn spectate(&self, game_id: &str) -> CommandOutcome {
        if !self.connected("spectate game") {
            return CommandOutcome::NotConnected;
        }
        if let Err(e) = self
            .session
            .with_game(|g| g.request_spectate(game_id.to_string()))
        {
            warn!(error = %e, "cannot spectate game");
            return CommandOutcome::WrongPhase;
        }
        self.send(Message::spectate(Some(game_id)))
    }

    /// Send a move. Legality is the server's call; only connectivity and role are checked.
    pub fn send_move(&self, mv: &str) -> CommandOutcome {
        if !self.connected("send move") {
            return CommandOutcome::NotConnected;
        }
        match self.session.with_game(|g| g.can_move()) {
            Ok(()) => self.send(Message::make_move(mv)),
            Err(MoveBlocked::Spectator) => {
                warn!("cannot send move: spectating");
                CommandOutcome::Spectator
            }
            Err(MoveBlocked::GameOver) => {
                warn!("cannot send move: game is over");
                CommandOutcome::GameOver
            }
        }
    }

    /// Send a chat line as `"{player_id}: {text}"`, stamped now unless `timestamp` is given.
    pub fn send_chat(&self, text: &str, timestamp: Option<Timestamp>) -> CommandOutcome {
        if !self.connected("send chat") {
            return CommandOutcome::NotConnected;
        }
        let Some(player_id) = self.session.player_id() else {
            warn!("cannot send chat: no player id");
            return CommandOutcome::NoIdentity;
        };
        let timestamp = timestamp.unwrap_or_else(now_timestamp);
        let line = format!("{}: {}", player_id, text);
        let game_id = self.session.game_id();
        let message = Message::chat(game_id.as_deref(), &line, timestamp);
        debug!(kind = %message.kind(), "sending");
        self.transport.send_chat(&message);
        CommandOutcome::Sent
    }

    fn connected(&self, action: &str) -> bool {
        let live = self.session.is_live();
        if !live {
            warn!(action, "not connected to server");
        }
        live
    }

    fn send(&self, message: Message) -> CommandOutcome {
        debug!(kind = %message.kind(), "sending");
        self.transport.send_message(&message);
        CommandOutcome::Sent
    }
}
