//! Chess Session Library
//!
//! This crate is the client-side session engine of the multiplayer chess client.
//!
//! # Overview
//!
//! - **Session** - One shared record of identity, game membership, role and
//!   connectivity, safe to read and write from every thread.
//!
//! - **Dispatchers** - Two background threads, one per server channel (game and
//!   chat), that apply inbound messages to the session and call the renderer.
//!
//! - **Commands** - The main thread's outbound path: join, spectate, move, chat.
//!
//! - **Shutdown** - Idempotent teardown reachable from any thread.
//!
//! # Design Principles
//!
//! 1. **One guarded access point** - Connectivity flags are atomics; game id, role
//!    and phase change together under one lock.
//!
//! 2. **Fail fast** - A channel that closes or errors ends the session. There is
//!    no reconnect.
//!
//! 3. **Server is authoritative** - Moves are not validated locally; rejections are
//!    informational.
//!
//! 4. **No rendering** - The UI is reached through the [`render::Renderer`] trait
//!    and may be absent.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chess_session::{
//!     client::{Client, LobbyAction},
//!     config::ClientConfig,
//!     transport::TcpTransport,
//! };
//!
//! let config = ClientConfig::default();
//! let transport = Arc::new(TcpTransport::new(config.clone()));
//! let client = Client::new(&config, transport);
//!
//! client.start(Some("alice"))?;
//! client.apply_lobby_action(LobbyAction::NewGame)?;
//! client.commands().send_chat("good luck", None);
//! client.commands().send_move("e2e4");
//! client.shutdown();
//! # Ok::<(), chess_session::error::ClientError>(())
//! ```

pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod render;
pub mod shutdown;
pub mod state;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{Client, LobbyAction};
pub use command::{CommandIssuer, CommandOutcome};
pub use error::ClientError;
pub use render::Renderer;
pub use state::{Role, Session, SessionPhase};
