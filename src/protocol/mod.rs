//! Client/server message protocol.
//!
//! - `message` - the tagged envelope and outbound constructors
//! - `event` - typed decoding of inbound messages

pub mod event;
pub mod message;

pub use event::{Board, ChatEvent, Color, GameResult, ServerEvent};
pub use message::{now_timestamp, Message, MessageKind, Payload, Timestamp};

use thiserror::Error;

/// A known message kind arrived with a payload that does not match its schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("{kind} message is missing field `{field}`")]
    MissingField {
        kind: MessageKind,
        field: &'static str,
    },

    #[error("{kind} field `{field}` should be a {expected}")]
    WrongType {
        kind: MessageKind,
        field: &'static str,
        expected: &'static str,
    },

    #[error("{kind} field `{field}` has unexpected value {value:?}")]
    InvalidValue {
        kind: MessageKind,
        field: &'static str,
        value: String,
    },
}
