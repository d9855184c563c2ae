//! Primary channel dispatcher.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::protocol::{Board, Message, MessageKind, ProtocolError, ServerEvent};
use crate::state::{InvalidTransition, Role, Session};
use crate::transport::{Transport, TransportError};

use super::{drive, ChannelHandler, DispatchExit};

/// Drains the primary channel and applies game protocol transitions.
pub struct MessageDispatcher {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
}

impl MessageDispatcher {
    pub fn new(session: Arc<Session>, transport: Arc<dyn Transport>) -> Self {
        Self { session, transport }
    }

    /// Block on the channel until the session ends.
    pub fn run(&self) -> DispatchExit {
        drive(self)
    }

    fn announce_start(
        &self,
        game_id: String,
        role: Result<Role, InvalidTransition>,
        board: &Board,
    ) {
        match role {
            Ok(Role::Spectator) => info!(%game_id, "spectating game"),
            Ok(role) => info!(%game_id, %role, "game started"),
            Err(e) => {
                warn!(%game_id, error = %e, "ignoring game start");
                return;
            }
        }
        self.render_board(board);
    }

    fn render_board(&self, board: &Board) {
        self.session.renderer().with(|r| r.update_board(board));
    }
}

impl ChannelHandler for MessageDispatcher {
    const CHANNEL: &'static str = "game";

    fn session(&self) -> &Session {
        &self.session
    }

    fn receive(&self) -> Result<Option<Message>, TransportError> {
        self.transport.receive()
    }

    fn handle(&self, message: &Message) -> Result<(), ProtocolError> {
        match ServerEvent::decode(message)? {
            ServerEvent::Waiting { message } => info!(%message, "waiting"),

            ServerEvent::GameStart {
                game_id,
                color,
                board,
            } => {
                // Players need a color; a pending spectate request does not.
                let role = self.session.with_game(|g| -> Result<_, ProtocolError> {
                    if g.is_spectator() {
                        return Ok(g.start_spectating(game_id.clone()));
                    }
                    let color = color.ok_or(ProtocolError::MissingField {
                        kind: MessageKind::GameStart,
                        field: "color",
                    })?;
                    Ok(g.start_game(game_id.clone(), color))
                })?;
                self.announce_start(game_id, role, &board);
            }

            ServerEvent::SpectateStart { game_id, board } => {
                let role = self
                    .session
                    .with_game(|g| g.start_spectating(game_id.clone()));
                self.announce_start(game_id, role, &board);
            }

            ServerEvent::GameUpdate { board, finished } => {
                self.render_board(&board);
                if let Some(result) = finished {
                    let ended = self
                        .session
                        .with_game(|g| g.end_game(result.winner.clone()));
                    match ended {
                        Ok(true) => info!(winner = ?result.winner, "game over"),
                        Ok(false) => {}
                        Err(e) => warn!(error = %e, "game over outside a game; phase unchanged"),
                    }
                    self.session
                        .renderer()
                        .with(|r| r.show_game_over(result.winner.as_deref()));
                }
            }

            ServerEvent::InvalidMove { message } => info!(%message, "move rejected"),

            ServerEvent::ServerError { message } => info!(%message, "server error"),

            ServerEvent::Ignored(kind) => debug!(%kind, "ignoring message"),
        }
        Ok(())
    }
}
