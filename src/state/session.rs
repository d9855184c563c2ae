//! Shared session state.
//!
//! One [`Session`] is created per client run and shared by the main thread and both
//! dispatcher threads through an `Arc`. Connectivity flags are atomics; game id,
//! role and phase sit behind one mutex and are only touched through the methods
//! here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::render::{Renderer, RendererSlot};

use super::game::{GameState, Role};
use super::phase::{InvalidTransition, SessionEvent, SessionPhase};

/// The client's authoritative record of identity, membership and connectivity.
///
/// `connected` and `running` only ever go from true to false once set; there is no
/// way to reset a session.
#[derive(Debug)]
pub struct Session {
    /// Set once during bootstrap
    player_id: OnceLock<String>,

    /// False until connect succeeds, false again for good after any channel failure
    connected: AtomicBool,

    /// True until shutdown is requested
    running: AtomicBool,

    game: Mutex<GameState>,

    renderer: RendererSlot,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Create a session: not connected, running.
    pub fn new() -> Self {
        Self {
            player_id: OnceLock::new(),
            connected: AtomicBool::new(false),
            running: AtomicBool::new(true),
            game: Mutex::new(GameState::new()),
            renderer: RendererSlot::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn player_id(&self) -> Option<&str> {
        self.player_id.get().map(String::as_str)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Both flags still up; dispatchers loop while this holds.
    pub fn is_live(&self) -> bool {
        self.is_running() && self.is_connected()
    }

    /// Record a successful transport connect.
    ///
    /// Only valid once, from `Connecting`, and only while running.
    pub fn mark_connected(&self) -> Result<(), InvalidTransition> {
        let mut game = self.lock_game();
        if !self.is_running() {
            return Err(InvalidTransition {
                from: game.phase().clone(),
                event: SessionEvent::Connected,
                reason: "Session already stopped",
            });
        }
        game.apply(SessionEvent::Connected)?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    /// Supply the player's identity.
    ///
    /// Returns `Ok(false)` when the identity is empty or blank: the session moves
    /// straight to `ShuttingDown` and stops running. Other ids are stored as given.
    pub fn identify(&self, player_id: &str) -> Result<bool, InvalidTransition> {
        let mut game = self.lock_game();
        if player_id.trim().is_empty() {
            game.apply(SessionEvent::IdentityMissing)?;
            self.running.store(false, Ordering::Release);
            return Ok(false);
        }
        game.apply(SessionEvent::IdentitySupplied)?;
        // Phase check above guarantees this is the first identity.
        let _ = self.player_id.set(player_id.to_string());
        Ok(true)
    }

    /// A channel failed: drop both flags and enter `ShuttingDown`.
    ///
    /// Returns `true` if this call was the one that cleared `connected`.
    pub fn mark_connection_lost(&self) -> bool {
        let was_connected = self.connected.swap(false, Ordering::AcqRel);
        self.running.store(false, Ordering::Release);
        let _ = self.lock_game().apply(SessionEvent::Shutdown);
        was_connected
    }

    /// Ask everything to stop.
    ///
    /// Returns `true` if this call was the one that cleared `running`.
    pub fn request_stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::AcqRel);
        let _ = self.lock_game().apply(SessionEvent::Shutdown);
        was_running
    }

    /// Run `f` with exclusive access to the game state.
    ///
    /// Do not call back into the renderer from inside `f`.
    pub fn with_game<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        f(&mut self.lock_game())
    }

    pub fn phase(&self) -> SessionPhase {
        self.lock_game().phase().clone()
    }

    pub fn role(&self) -> Role {
        self.lock_game().role()
    }

    pub fn game_id(&self) -> Option<String> {
        self.lock_game().game_id().map(str::to_string)
    }

    /// Record the lobby's chosen game.
    pub fn select_game(&self, game_id: impl Into<String>) -> Result<(), InvalidTransition> {
        self.lock_game().select_game(game_id.into())
    }

    pub fn renderer(&self) -> &RendererSlot {
        &self.renderer
    }

    pub fn attach_renderer(&self, renderer: &Arc<dyn Renderer>) {
        self.renderer.attach(renderer);
    }

    /// Consistent copy of the whole session for the UI.
    pub fn snapshot(&self) -> SessionSnapshot {
        let game = self.lock_game();
        SessionSnapshot {
            player_id: self.player_id().map(str::to_string),
            phase: game.phase().clone(),
            role: game.role(),
            game_id: game.game_id().map(str::to_string),
            connected: self.is_connected(),
            running: self.is_running(),
        }
    }

    fn lock_game(&self) -> MutexGuard<'_, GameState> {
        // GameState has no invariants a panicking holder could break halfway.
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time copy of a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub player_id: Option<String>,
    pub phase: SessionPhase,
    pub role: Role,
    pub game_id: Option<String>,
    pub connected: bool,
    pub running: bool,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "player_id": self.player_id,
            "phase": self.phase.as_str(),
            "role": self.role.as_str(),
            "game_id": self.game_id,
            "connected": self.connected,
            "running": self.running
        });
        if let SessionPhase::GameOver { winner } = &self.phase {
            obj["winner"] = serde_json::json!(winner);
        }
        obj
    }
}
