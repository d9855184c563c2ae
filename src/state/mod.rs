//! Session state.
//!
//! - `phase` - session phase state machine
//! - `game` - game id, role and phase, mutated together
//! - `session` - the shared, thread-safe session record
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Session                              │
//! │                                                              │
//! │  player_id   OnceLock<String>      set once at bootstrap     │
//! │  connected   AtomicBool            true once, then false     │
//! │  running     AtomicBool            true until shutdown       │
//! │  renderer    RwLock<Weak<dyn ..>>  optional, non-owning      │
//! │                                                              │
//! │  ┌────────────────── Mutex<GameState> ───────────────────┐   │
//! │  │  game_id: Option<String>                              │   │
//! │  │  role:    Unassigned | White | Black | Spectator      │   │
//! │  │  phase:   Connecting ─▶ IdentityPending ─▶ Lobby ─▶   │   │
//! │  │           InGame/Spectating ─▶ GameOver               │   │
//! │  │           (any) ─▶ ShuttingDown                       │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use chess_session::state::{Role, Session, SessionPhase};
//!
//! let session = Session::new();
//! session.mark_connected().unwrap();
//! session.identify("alice").unwrap();
//! assert_eq!(session.phase(), SessionPhase::Lobby);
//! assert_eq!(session.role(), Role::Unassigned);
//! ```

pub mod game;
pub mod phase;
pub mod session;

pub use game::{GameState, MoveBlocked, Role};
pub use phase::{InvalidTransition, PhaseMachine, SessionEvent, SessionPhase};
pub use session::{Session, SessionSnapshot};
