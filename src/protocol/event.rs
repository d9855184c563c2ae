//! Typed views of inbound messages.
//!
//! Dispatchers decode each [`Message`] into a [`ServerEvent`] or [`ChatEvent`]
//! before touching session state, so schema problems surface as a
//! [`ProtocolError`] rather than half-applied updates.

use serde_json::Value;

use super::{Message, MessageKind, ProtocolError, Timestamp};

/// Board position as sent by the server. Opaque to the session engine.
pub type Board = Value;

/// Side a player has been seated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
        }
    }

    fn parse(kind: &MessageKind, value: &str) -> Result<Self, ProtocolError> {
        match value.to_ascii_lowercase().as_str() {
            "white" => Ok(Self::White),
            "black" => Ok(Self::Black),
            _ => Err(ProtocolError::InvalidValue {
                kind: kind.clone(),
                field: "color",
                value: value.to_string(),
            }),
        }
    }
}

/// A primary-channel message after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Server is looking for an opponent.
    Waiting { message: String },

    /// A game began with this client seated (or watching, if it asked to spectate).
    GameStart {
        game_id: String,
        color: Option<Color>,
        board: Board,
    },

    /// A spectate request was accepted.
    SpectateStart { game_id: String, board: Board },

    /// New position; `finished` carries the winner when the game ended.
    GameUpdate {
        board: Board,
        finished: Option<GameResult>,
    },

    /// Server rejected the last move.
    InvalidMove { message: String },

    /// Server-side error text.
    ServerError { message: String },

    /// Kind not handled on the primary channel.
    Ignored(MessageKind),
}

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// `None` when the server reports no winner (draw).
    pub winner: Option<String>,
}

impl ServerEvent {
    pub fn decode(msg: &Message) -> Result<Self, ProtocolError> {
        let event = match msg.kind() {
            MessageKind::Waiting => Self::Waiting {
                message: msg.str_field("message")?.to_string(),
            },
            MessageKind::GameStart => Self::GameStart {
                game_id: msg.id_field("game_id")?,
                color: msg
                    .opt_str_field("color")?
                    .map(|c| Color::parse(msg.kind(), c))
                    .transpose()?,
                board: msg.value("board")?.clone(),
            },
            MessageKind::SpectateStart => Self::SpectateStart {
                game_id: msg.id_field("game_id")?,
                board: msg.value("board")?.clone(),
            },
            MessageKind::GameUpdate => {
                let board = msg.value("board")?.clone();
                let finished = if msg.bool_field("game_over")? {
                    Some(GameResult {
                        winner: msg.opt_str_field("winner")?.map(str::to_string),
                    })
                } else {
                    None
                };
                Self::GameUpdate { board, finished }
            }
            MessageKind::InvalidMove => Self::InvalidMove {
                message: msg.str_field("message")?.to_string(),
            },
            MessageKind::Error => Self::ServerError {
                message: msg.str_field("message")?.to_string(),
            },
            other => Self::Ignored(other.clone()),
        };
        Ok(event)
    }
}

/// A chat-channel message after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Line {
        text: String,
        timestamp: Option<Timestamp>,
    },
    Ignored(MessageKind),
}

impl ChatEvent {
    pub fn decode(msg: &Message) -> Result<Self, ProtocolError> {
        match msg.kind() {
            MessageKind::Chat => Ok(Self::Line {
                text: msg.str_field("message")?.to_string(),
                timestamp: msg.opt_f64_field("timestamp")?,
            }),
            other => Ok(Self::Ignored(other.clone())),
        }
    }
}
