//! Protocol message envelope.
//!
//! A [`Message`] is a kind tag plus a string-keyed payload. Inbound messages are
//! produced by the transport on decode and consumed exactly once by a dispatcher;
//! outbound messages are built by the command path through the constructors here.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ProtocolError;

/// Message payload: field name to JSON value.
pub type Payload = Map<String, Value>;

/// Seconds since the Unix epoch, fractional.
pub type Timestamp = f64;

/// Current wall-clock time as a [`Timestamp`].
pub fn now_timestamp() -> Timestamp {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Every message kind the client knows about.
///
/// Kinds the client does not recognise are kept verbatim in [`MessageKind::Unknown`]
/// so that newer servers can add kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    // Inbound, primary channel
    Waiting,
    GameStart,
    SpectateStart,
    GameUpdate,
    InvalidMove,
    Error,

    // Either direction, chat channel
    Chat,

    // Outbound
    JoinLobby,
    Spectate,
    Move,

    Unknown(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Waiting => "WAITING",
            Self::GameStart => "GAME_START",
            Self::SpectateStart => "SPECTATE_START",
            Self::GameUpdate => "GAME_UPDATE",
            Self::InvalidMove => "INVALID_MOVE",
            Self::Error => "ERROR",
            Self::Chat => "CHAT",
            Self::JoinLobby => "JOIN_LOBBY",
            Self::Spectate => "SPECTATE",
            Self::Move => "MOVE",
            Self::Unknown(kind) => kind,
        }
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "WAITING" => Self::Waiting,
            "GAME_START" => Self::GameStart,
            "SPECTATE_START" => Self::SpectateStart,
            "GAME_UPDATE" => Self::GameUpdate,
            "INVALID_MOVE" => Self::InvalidMove,
            "ERROR" => Self::Error,
            "CHAT" => Self::Chat,
            "JOIN_LOBBY" => Self::JoinLobby,
            "SPECTATE" => Self::Spectate,
            "MOVE" => Self::Move,
            _ => Self::Unknown(kind),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        Self::from(kind.to_string())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol message.
///
/// Serialized as `{"type": KIND, "data": {...}}`. Fields are private so a message
/// cannot be altered after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    kind: MessageKind,

    #[serde(rename = "data", default)]
    payload: Payload,
}

impl Message {
    pub fn new(kind: impl Into<MessageKind>, payload: Payload) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Build a message from a `serde_json::json!` object literal.
    ///
    /// Non-object values produce an empty payload.
    pub fn from_json(kind: impl Into<MessageKind>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            _ => Payload::new(),
        };
        Self::new(kind, payload)
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Raw field lookup.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }

    /// Required field of any type.
    pub fn value(&self, field: &'static str) -> Result<&Value, ProtocolError> {
        self.payload
            .get(field)
            .ok_or_else(|| ProtocolError::MissingField {
                kind: self.kind.clone(),
                field,
            })
    }

    /// Required string field.
    pub fn str_field(&self, field: &'static str) -> Result<&str, ProtocolError> {
        self.value(field)?
            .as_str()
            .ok_or_else(|| self.wrong_type(field, "string"))
    }

    /// Required boolean field.
    pub fn bool_field(&self, field: &'static str) -> Result<bool, ProtocolError> {
        self.value(field)?
            .as_bool()
            .ok_or_else(|| self.wrong_type(field, "bool"))
    }

    /// Optional string field; JSON `null` counts as absent.
    pub fn opt_str_field(&self, field: &'static str) -> Result<Option<&str>, ProtocolError> {
        match self.payload.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.wrong_type(field, "string")),
        }
    }

    /// Optional numeric field; JSON `null` counts as absent.
    pub fn opt_f64_field(&self, field: &'static str) -> Result<Option<f64>, ProtocolError> {
        match self.payload.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.wrong_type(field, "number")),
        }
    }

    /// Required identifier field. Servers may send ids as strings or numbers.
    pub fn id_field(&self, field: &'static str) -> Result<String, ProtocolError> {
        match self.value(field)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            _ => Err(self.wrong_type(field, "string or number")),
        }
    }

    fn wrong_type(&self, field: &'static str, expected: &'static str) -> ProtocolError {
        ProtocolError::WrongType {
            kind: self.kind.clone(),
            field,
            expected,
        }
    }

    // Outbound constructors

    pub fn join_lobby(player_id: &str) -> Self {
        Self::from_json(
            MessageKind::JoinLobby,
            serde_json::json!({ "player_id": player_id }),
        )
    }

    pub fn spectate(game_id: Option<&str>) -> Self {
        Self::from_json(
            MessageKind::Spectate,
            serde_json::json!({ "game_id": game_id }),
        )
    }

    pub fn make_move(mv: &str) -> Self {
        Self::from_json(MessageKind::Move, serde_json::json!({ "move": mv }))
    }

    /// Outbound chat line. `text` is sent as-is; callers add the sender prefix.
    pub fn chat(game_id: Option<&str>, text: &str, timestamp: Timestamp) -> Self {
        Self::from_json(
            MessageKind::Chat,
            serde_json::json!({
                "game_id": game_id,
                "message": text,
                "timestamp": timestamp
            }),
        )
    }
}
