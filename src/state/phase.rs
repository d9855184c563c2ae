//! Session phase state machine.
//!
//! Tracks where the client is in its lifetime and validates transitions.
//!
//! # State Diagram
//!
//! ```text
//! ┌────────────┐ connected ┌─────────────────┐ identity ┌─────────┐
//! │ Connecting │──────────▶│ IdentityPending │─────────▶│  Lobby  │
//! └────────────┘           └────────┬────────┘          └────┬────┘
//!                                   │ no identity            │
//!                                   │          game_start    │ spectate_start
//!                                   │        ┌───────────────┴──────────┐
//!                                   │        ▼                          ▼
//!                                   │  ┌───────────┐             ┌────────────┐
//!                                   │  │  InGame   │             │ Spectating │
//!                                   │  └─────┬─────┘             └──────┬─────┘
//!                                   │        │ game_over                │
//!                                   │        ▼                          │
//!                                   │  ┌───────────┐                    │
//!                                   │  │ GameOver  │◀───────────────────┘
//!                                   │  └───────────┘
//!                                   ▼
//!                           ┌──────────────┐
//!                           │ ShuttingDown │  (reachable from every phase; terminal)
//!                           └──────────────┘
//! ```
//!
//! A new `GAME_START` or `SPECTATE_START` is also accepted while already in a
//! game or after one ended; the server decides when a game begins.

use std::fmt;

/// Where the session currently is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Transport not yet connected
    #[default]
    Connecting,

    /// Connected, waiting for the player to supply an identity
    IdentityPending,

    /// Identified, not in a game
    Lobby,

    /// Seated in a game
    InGame,

    /// Watching a game
    Spectating,

    /// Game finished; chat still works, moves do not
    GameOver { winner: Option<String> },

    /// Teardown requested; terminal
    ShuttingDown,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::IdentityPending => "identity_pending",
            Self::Lobby => "lobby",
            Self::InGame => "in_game",
            Self::Spectating => "spectating",
            Self::GameOver { .. } => "game_over",
            Self::ShuttingDown => "shutting_down",
        }
    }

    /// Check if a game is live (playing or watching).
    pub fn is_in_game(&self) -> bool {
        matches!(self, Self::InGame | Self::Spectating)
    }

    pub fn is_game_over(&self) -> bool {
        matches!(self, Self::GameOver { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ShuttingDown)
    }

    /// Check if game or spectate start messages may be applied.
    fn accepts_game_start(&self) -> bool {
        matches!(
            self,
            Self::Lobby | Self::InGame | Self::Spectating | Self::GameOver { .. }
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameOver {
                winner: Some(winner),
            } => write!(f, "GameOver({})", winner),
            Self::GameOver { winner: None } => write!(f, "GameOver(draw)"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Phase transition events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected,
    IdentitySupplied,
    IdentityMissing,
    GameStarted,
    SpectateStarted,
    GameEnded { winner: Option<String> },
    Shutdown,
}

/// Error when a phase transition is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: SessionPhase,
    pub event: SessionEvent,
    pub reason: &'static str,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid transition from {} via {:?}: {}",
            self.from, self.event, self.reason
        )
    }
}

impl std::error::Error for InvalidTransition {}

/// Phase machine.
///
/// Encapsulates valid transitions; `ShuttingDown` is absorbing.
#[derive(Debug, Clone, Default)]
pub struct PhaseMachine {
    phase: SessionPhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start at a specific phase (for tests and restores).
    pub fn at(phase: SessionPhase) -> Self {
        Self { phase }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Apply an event, returning the new machine or an error.
    pub fn apply(&self, event: SessionEvent) -> Result<Self, InvalidTransition> {
        Ok(Self {
            phase: self.transition(&event)?,
        })
    }

    /// Apply an event in place. The phase is left untouched on error.
    pub fn apply_mut(&mut self, event: SessionEvent) -> Result<(), InvalidTransition> {
        self.phase = self.transition(&event)?;
        Ok(())
    }

    fn transition(&self, event: &SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        use SessionEvent::*;
        use SessionPhase::*;

        let invalid = |reason: &'static str| InvalidTransition {
            from: self.phase.clone(),
            event: event.clone(),
            reason,
        };

        match (&self.phase, event) {
            // Shutdown: Any -> ShuttingDown, repeatable
            (_, Shutdown) => Ok(ShuttingDown),
            (ShuttingDown, _) => Err(invalid("Session is shutting down")),

            // Connected: Connecting -> IdentityPending
            (Connecting, Connected) => Ok(IdentityPending),
            (_, Connected) => Err(invalid("Already connected")),

            // Identity: IdentityPending -> Lobby, or abort
            (IdentityPending, IdentitySupplied) => Ok(Lobby),
            (IdentityPending, IdentityMissing) => Ok(ShuttingDown),
            (Connecting, IdentitySupplied | IdentityMissing) => {
                Err(invalid("Must connect first"))
            }
            (_, IdentitySupplied | IdentityMissing) => Err(invalid("Identity already set")),

            // GameStarted / SpectateStarted: Lobby (or a previous game) -> InGame / Spectating
            (phase, GameStarted) if phase.accepts_game_start() => Ok(InGame),
            (phase, SpectateStarted) if phase.accepts_game_start() => Ok(Spectating),
            (_, GameStarted | SpectateStarted) => Err(invalid("Must be in the lobby first")),

            // GameEnded: InGame/Spectating -> GameOver; repeated end reports are absorbed
            (InGame | Spectating, GameEnded { winner }) => Ok(GameOver {
                winner: winner.clone(),
            }),
            (GameOver { winner }, GameEnded { .. }) => Ok(GameOver {
                winner: winner.clone(),
            }),
            (_, GameEnded { .. }) => Err(invalid("No game in progress")),
        }
    }

    // Convenience methods for common checks

    pub fn is_in_game(&self) -> bool {
        self.phase.is_in_game()
    }

    pub fn is_game_over(&self) -> bool {
        self.phase.is_game_over()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }
}
