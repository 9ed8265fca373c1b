//! WebSocket protocol messages for Othello Duel.
//!
//! Every frame is a JSON object tagged by `type`. Field names are camelCase
//! to match the browser client.

use othello_core::{Board, Color};
use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Place a piece at a board index
    Move {
        #[serde(rename = "move")]
        index: usize,
    },

    /// Concede the game
    Resign,

    /// Send chat message
    Chat {
        #[serde(rename = "chatMessage")]
        chat_message: String,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Color assigned to this connection (unicast)
    Color { color: Color },

    /// Both players are present and a fresh game begins
    Start {
        board: Board,
        #[serde(rename = "currentPlayer")]
        current_player: Color,
        message: String,
    },

    /// Board after an accepted move
    Update {
        board: Board,
        #[serde(rename = "currentPlayer")]
        current_player: Color,
    },

    /// Chat message relayed from a player
    Chat {
        #[serde(rename = "chatMessage")]
        chat_message: String,
        color: Color,
    },

    /// Game result, by score or by resignation
    Winner { message: String },

    /// Rejections and advisory notices
    Error { message: String },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Color { .. } => "color",
            ServerMessage::Start { .. } => "start",
            ServerMessage::Update { .. } => "update",
            ServerMessage::Chat { .. } => "chat",
            ServerMessage::Winner { .. } => "winner",
            ServerMessage::Error { .. } => "error",
        }
    }
}
