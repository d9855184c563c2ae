//! Headless chess client.
//!
//! # Usage
//!
//! ```bash
//! # Connect to a local server as alice
//! chess-client --player-id alice
//!
//! # Remote server, settings from a file
//! chess-client --config client.json --host chess.example.org
//! ```
//!
//! Commands on stdin: `new`, `join <game>`, `spectate <game>`, `move <move>`,
//! `chat <text>`, `status`, `quit`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chess_session::{
    config::ClientConfig,
    protocol::{Board, Timestamp},
    transport::TcpTransport,
    Client, LobbyAction, Renderer,
};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Multiplayer chess client
#[derive(Parser, Debug)]
#[command(name = "chess-client")]
#[command(about = "Headless multiplayer chess client")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides the config file)
    #[arg(long)]
    host: Option<String>,

    /// Game channel port (overrides the config file)
    #[arg(long)]
    game_port: Option<u16>,

    /// Chat channel port (overrides the config file)
    #[arg(long)]
    chat_port: Option<u16>,

    /// Player id; prompted for when omitted
    #[arg(short, long)]
    player_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Prints board, chat and results to stdout.
struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn update_board(&self, board: &Board) {
        match board {
            serde_json::Value::String(fen) => println!("board: {}", fen),
            other => println!("board: {}", other),
        }
    }

    fn show_game_over(&self, winner: Option<&str>) {
        match winner {
            Some(winner) => println!("Game over! Winner: {}", winner),
            None => println!("Game over! Draw."),
        }
    }

    fn display_chat(&self, text: &str, timestamp: Timestamp) {
        let secs = timestamp.trunc() as i64;
        let nanos = (timestamp.fract() * 1e9) as u32;
        match chrono::DateTime::from_timestamp(secs, nanos) {
            Some(at) => {
                let local = at.with_timezone(&chrono::Local);
                println!("[{}] {}", local.format("%H:%M"), text);
            }
            None => println!("{}", text),
        }
    }

    fn shutdown(&self) {
        println!("Disconnected.");
    }
}

fn load_config(args: &Args) -> Result<ClientConfig, chess_session::ClientError> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)?,
        None => ClientConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.game_port {
        config.game_port = port;
    }
    if let Some(port) = args.chat_port {
        config.chat_port = port;
    }
    Ok(config)
}

fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn run_commands(client: &Client) -> io::Result<()> {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        if !client.is_running() {
            break;
        }
        let line = line?;
        let (cmd, rest) = line
            .trim()
            .split_once(' ')
            .map(|(c, r)| (c, r.trim()))
            .unwrap_or((line.trim(), ""));

        let result = match cmd {
            "" => continue,
            "new" => client.apply_lobby_action(LobbyAction::NewGame).map(drop),
            "join" => client
                .apply_lobby_action(LobbyAction::Join(rest.to_string()))
                .map(drop),
            "spectate" => client
                .apply_lobby_action(LobbyAction::Spectate(rest.to_string()))
                .map(drop),
            "move" => {
                client.commands().send_move(rest);
                Ok(())
            }
            "chat" => {
                client.commands().send_chat(rest, None);
                Ok(())
            }
            "status" => {
                println!("{}", client.session().snapshot().to_json());
                Ok(())
            }
            "quit" => {
                client.shutdown();
                break;
            }
            other => {
                println!("unknown command: {}", other);
                Ok(())
            }
        };

        if let Err(e) = result {
            tracing::error!(error = %e, "command failed");
            if e.is_fatal() {
                break;
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let config = load_config(&args)?;
    tracing::info!("Connecting to {}:{}", config.host, config.game_port);

    let transport = Arc::new(TcpTransport::new(config.clone()));
    let client = Client::with_exit_hook(&config, transport, Box::new(|| std::process::exit(0)));

    let renderer: Arc<dyn Renderer> = Arc::new(ConsoleRenderer);
    client.attach_renderer(&renderer);

    if let Err(e) = client.connect() {
        tracing::error!("{}. Make sure the server is running.", e);
        std::process::exit(1);
    }

    let player_id = match args.player_id.clone() {
        Some(id) => Some(id),
        None => prompt("Player id: ")?,
    };
    client.identify(player_id.as_deref())?;
    client.spawn_dispatchers()?;

    run_commands(&client)?;
    client.shutdown();
    Ok(())
}
