//! Game membership state.
//!
//! Tracks which game the client belongs to, in what role, and the phase machine.
//! [`GameState`] is plain data; [`crate::state::Session`] keeps it behind a single
//! mutex so every read-modify-write happens under one lock.

use std::fmt;

use crate::protocol::Color;

use super::phase::{InvalidTransition, PhaseMachine, SessionEvent, SessionPhase};

/// The player's relationship to the active game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Unassigned,
    White,
    Black,
    Spectator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unassigned => "unassigned",
            Self::White => "white",
            Self::Black => "black",
            Self::Spectator => "spectator",
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self, Self::White | Self::Black)
    }
}

impl From<Color> for Role {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Self::White,
            Color::Black => Self::Black,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a move may not be sent right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveBlocked {
    Spectator,
    GameOver,
}

/// Game id, role and phase, always mutated together.
///
/// Invariant: `role != Unassigned` implies `game_id.is_some()`.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    machine: PhaseMachine,
    game_id: Option<String>,
    role: Role,
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        self.machine.phase()
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn winner(&self) -> Option<&str> {
        match self.machine.phase() {
            SessionPhase::GameOver { winner } => winner.as_deref(),
            _ => None,
        }
    }

    pub fn is_spectator(&self) -> bool {
        self.role == Role::Spectator
    }

    /// Apply a bare phase event (connect, identity, shutdown).
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), InvalidTransition> {
        self.machine.apply_mut(event)
    }

    /// Record the game picked in the lobby before joining it.
    pub fn select_game(&mut self, game_id: String) -> Result<(), InvalidTransition> {
        self.require_lobby(SessionEvent::GameStarted)?;
        self.game_id = Some(game_id);
        Ok(())
    }

    /// Record the game to watch and take the spectator role ahead of the server's reply.
    pub fn request_spectate(&mut self, game_id: String) -> Result<(), InvalidTransition> {
        self.require_lobby(SessionEvent::SpectateStarted)?;
        self.game_id = Some(game_id);
        self.role = Role::Spectator;
        Ok(())
    }

    /// Apply `GAME_START`. A client that asked to spectate keeps the spectator role.
    ///
    /// Returns the role now in effect.
    pub fn start_game(&mut self, game_id: String, color: Color) -> Result<Role, InvalidTransition> {
        if self.is_spectator() {
            return self.start_spectating(game_id);
        }
        self.machine.apply_mut(SessionEvent::GameStarted)?;
        self.game_id = Some(game_id);
        self.role = color.into();
        Ok(self.role)
    }

    /// Apply `SPECTATE_START`; the role is forced to spectator.
    pub fn start_spectating(&mut self, game_id: String) -> Result<Role, InvalidTransition> {
        self.machine.apply_mut(SessionEvent::SpectateStarted)?;
        self.game_id = Some(game_id);
        self.role = Role::Spectator;
        Ok(self.role)
    }

    /// Apply a game-over update.
    ///
    /// Returns `true` the first time the game ends, `false` for repeated reports.
    pub fn end_game(&mut self, winner: Option<String>) -> Result<bool, InvalidTransition> {
        let was_over = self.machine.is_game_over();
        self.machine.apply_mut(SessionEvent::GameEnded { winner })?;
        Ok(!was_over)
    }

    pub fn can_move(&self) -> Result<(), MoveBlocked> {
        if self.is_spectator() {
            Err(MoveBlocked::Spectator)
        } else if self.machine.is_game_over() {
            Err(MoveBlocked::GameOver)
        } else {
            Ok(())
        }
    }

    fn require_lobby(&self, event: SessionEvent) -> Result<(), InvalidTransition> {
        if *self.machine.phase() == SessionPhase::Lobby {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self.machine.phase().clone(),
                event,
                reason: "Games are chosen from the lobby",
            })
        }
    }
}
