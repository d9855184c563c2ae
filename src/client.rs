//! Client session engine.
//!
//! [`Client`] wires one [`Session`] to a [`Transport`], the two dispatcher
//! threads, the [`CommandIssuer`] and the [`ShutdownCoordinator`].
//!
//! ```text
//!   main thread ── CommandIssuer ──▶ Transport ◀── MessageDispatcher (session-game)
//!        │                               ▲
//!        │                               └──────── ChatDispatcher    (session-chat)
//!        ▼
//!   ShutdownCoordinator ◀── any thread on quit or channel loss
//! ```

use std::sync::Arc;
use std::thread;

use tracing::{error, info, warn};

use crate::command::{CommandIssuer, CommandOutcome};
use crate::config::ClientConfig;
use crate::dispatch::{ChatDispatcher, DispatchExit, MessageDispatcher};
use crate::error::ClientError;
use crate::render::Renderer;
use crate::shutdown::{ExitHook, ShutdownCoordinator};
use crate::state::Session;
use crate::transport::Transport;

/// What the player picked in the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyAction {
    /// Get paired into a new game
    NewGame,
    /// Join a listed game
    Join(String),
    /// Watch a listed game
    Spectate(String),
    Quit,
}

/// A running client.
pub struct Client {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    commands: CommandIssuer,
    coordinator: Arc<ShutdownCoordinator>,
}

impl Client {
    pub fn new(config: &ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self::build(config, transport, None)
    }

    /// Like [`Client::new`], running `hook` as the last step of teardown.
    pub fn with_exit_hook(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        hook: ExitHook,
    ) -> Self {
        Self::build(config, transport, Some(hook))
    }

    fn build(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        hook: Option<ExitHook>,
    ) -> Self {
        let session = Session::shared();
        let mut coordinator = ShutdownCoordinator::new(
            Arc::clone(&session),
            Arc::clone(&transport),
            config.shutdown_join_timeout(),
        );
        if let Some(hook) = hook {
            coordinator = coordinator.with_exit_hook(hook);
        }
        Self {
            commands: CommandIssuer::new(Arc::clone(&session), Arc::clone(&transport)),
            session,
            transport,
            coordinator: Arc::new(coordinator),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn commands(&self) -> &CommandIssuer {
        &self.commands
    }

    pub fn attach_renderer(&self, renderer: &Arc<dyn Renderer>) {
        self.session.attach_renderer(renderer);
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Connect, take the identity, and start both dispatchers.
    ///
    /// `None` or a blank identity shuts the session down.
    pub fn start(&self, identity: Option<&str>) -> Result<(), ClientError> {
        self.connect()?;
        self.identify(identity)?;
        self.spawn_dispatchers()
    }

    /// Open the transport. Failure is fatal and not retried.
    pub fn connect(&self) -> Result<(), ClientError> {
        if let Err(e) = self.transport.connect() {
            error!(error = %e, "failed to connect to the server");
            return Err(ClientError::ConnectFailed(e));
        }
        self.session.mark_connected()?;
        Ok(())
    }

    pub fn identify(&self, identity: Option<&str>) -> Result<(), ClientError> {
        if self.session.identify(identity.unwrap_or_default())? {
            info!(player_id = ?self.session.player_id(), "identified");
            Ok(())
        } else {
            warn!("no player id entered");
            self.shutdown();
            Err(ClientError::MissingIdentity)
        }
    }

    /// Start the game and chat receiver threads.
    pub fn spawn_dispatchers(&self) -> Result<(), ClientError> {
        let game = MessageDispatcher::new(Arc::clone(&self.session), Arc::clone(&self.transport));
        self.spawn_worker("session-game", move || game.run())?;

        let chat = ChatDispatcher::new(Arc::clone(&self.session), Arc::clone(&self.transport));
        self.spawn_worker("session-chat", move || chat.run())
    }

    fn spawn_worker<F>(&self, name: &str, run: F) -> Result<(), ClientError>
    where
        F: FnOnce() -> DispatchExit + Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            let exit = run();
            if exit == DispatchExit::ChannelLost {
                coordinator.shutdown();
            }
            exit
        });
        match spawned {
            Ok(handle) => {
                self.coordinator.register(handle);
                Ok(())
            }
            Err(e) => {
                error!(thread = name, error = %e, "failed to start dispatcher");
                self.shutdown();
                Err(ClientError::Spawn(e))
            }
        }
    }

    /// Carry out the player's lobby choice.
    ///
    /// Fails with [`ClientError::ConnectionLost`] (after shutting down) if the
    /// connection is gone once the action has been issued.
    pub fn apply_lobby_action(&self, action: LobbyAction) -> Result<CommandOutcome, ClientError> {
        let outcome = match action {
            LobbyAction::Quit => {
                self.shutdown();
                return Ok(CommandOutcome::Quit);
            }
            LobbyAction::NewGame => {
                info!("joining lobby");
                self.commands.join_lobby()
            }
            LobbyAction::Join(game_id) => {
                info!(%game_id, "joining game");
                self.session.select_game(game_id)?;
                self.commands.join_lobby()
            }
            LobbyAction::Spectate(game_id) => {
                info!(%game_id, "spectating game");
                self.commands.spectate(&game_id)
            }
        };

        if !self.session.is_connected() {
            warn!("connection lost after lobby action");
            self.shutdown();
            return Err(ClientError::ConnectionLost);
        }
        Ok(outcome)
    }

    /// Tear everything down. Safe to call repeatedly and from any thread.
    pub fn shutdown(&self) -> bool {
        self.coordinator.shutdown()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.coordinator.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;
    use crate::state::{Role, SessionPhase};
    use crate::testing::{attach_recorder, RenderCall, ScriptedTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    fn config() -> ClientConfig {
        ClientConfig {
            shutdown_join_timeout_ms: 200,
            ..ClientConfig::default()
        }
    }

    fn wait_until(mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_connect_failure_is_fatal() {
        let transport = ScriptedTransport::refusing().shared();
        let client = Client::new(&config(), transport.clone());

        let err = client.start(Some("p1")).unwrap_err();
        assert!(matches!(err, ClientError::ConnectFailed(_)));
        assert!(err.is_fatal());
        assert_eq!(transport.connect_count(), 1);
        assert!(!client.session().is_connected());
    }

    #[test]
    fn test_missing_identity_shuts_down() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());

        let err = client.start(None).unwrap_err();
        assert!(matches!(err, ClientError::MissingIdentity));
        assert!(!client.is_running());
        assert_eq!(client.session().phase(), SessionPhase::ShuttingDown);
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn test_full_game_flow() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());
        let recorder = attach_recorder(client.session());

        client.start(Some("p1")).unwrap();
        assert_eq!(
            client.apply_lobby_action(LobbyAction::NewGame).unwrap(),
            CommandOutcome::Sent
        );

        transport.push(Ok(Some(Message::from_json(
            "GAME_START",
            json!({"game_id": "g1", "color": "white", "board": "B0"}),
        ))));
        transport.push_chat(Ok(Some(Message::from_json(
            "CHAT",
            json!({"message": "p2: hi", "timestamp": 7}),
        ))));
        wait_until(|| client.session().role() == Role::White);
        wait_until(|| recorder.count(|c| matches!(c, RenderCall::Chat(..))) == 1);

        assert!(client.commands().send_move("e2e4").is_sent());
        assert_eq!(
            transport.sent(),
            vec![Message::join_lobby("p1"), Message::make_move("e2e4")]
        );

        assert!(client.shutdown());
        assert!(!client.shutdown());
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn test_channel_loss_tears_down() {
        let transport = ScriptedTransport::new().shared();
        transport.push(Ok(None));
        let exits = Arc::new(AtomicUsize::new(0));
        let client = {
            let exits = Arc::clone(&exits);
            Client::with_exit_hook(
                &config(),
                transport.clone(),
                Box::new(move || {
                    exits.fetch_add(1, Ordering::SeqCst);
                }),
            )
        };
        let recorder = attach_recorder(client.session());

        client.start(Some("p1")).unwrap();

        wait_until(|| exits.load(Ordering::SeqCst) == 1);
        assert!(!client.session().is_connected());
        assert!(!client.is_running());
        assert_eq!(transport.close_count(), 1);
        assert!(recorder.count(|c| *c == RenderCall::Shutdown) >= 1);

        // Main thread quitting afterwards is a no-op
        assert!(!client.shutdown());
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_spectate_action() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());
        client.start(Some("p1")).unwrap();

        client
            .apply_lobby_action(LobbyAction::Spectate("g5".to_string()))
            .unwrap();
        assert_eq!(client.session().role(), Role::Spectator);
        assert_eq!(transport.sent(), vec![Message::spectate(Some("g5"))]);
        assert_eq!(
            client.commands().send_move("e2e4"),
            CommandOutcome::Spectator
        );
    }

    #[test]
    fn test_join_action_selects_game() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());
        client.start(Some("p1")).unwrap();

        client
            .apply_lobby_action(LobbyAction::Join("g2".to_string()))
            .unwrap();
        assert_eq!(client.session().game_id().as_deref(), Some("g2"));
        assert_eq!(client.session().role(), Role::Unassigned);
    }

    #[test]
    fn test_quit_action() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());
        client.start(Some("p1")).unwrap();

        let outcome = client.apply_lobby_action(LobbyAction::Quit).unwrap();
        assert_eq!(outcome, CommandOutcome::Quit);
        assert!(!outcome.is_sent());
        assert!(!client.is_running());
        assert_eq!(transport.close_count(), 1);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_lobby_action_after_loss() {
        let transport = ScriptedTransport::new().shared();
        let client = Client::new(&config(), transport.clone());
        client.start(Some("p1")).unwrap();
        client.session().mark_connection_lost();

        let err = client.apply_lobby_action(LobbyAction::NewGame).unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_drop_shuts_down() {
        let transport = ScriptedTransport::new().shared();
        {
            let client = Client::new(&config(), transport.clone());
            client.start(Some("p1")).unwrap();
        }
        assert_eq!(transport.close_count(), 1);
    }
}
