//! WebSocket event DTOs.
//!
//! Every frame is a JSON object tagged by `type`:
//!
//! ```text
//! client → server: {"type":"join","room_id":"r1","display_name":"alice"}
//!                  {"type":"message","text":"hi"}
//!                  {"type":"typing","is_typing":true}
//! server → client: {"type":"member-count","count":2}
//! ```

use serde::{Deserialize, Serialize};

/// Inbound event sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    Join {
        /// Falls back to the server's default room when omitted
        #[serde(default)]
        room_id: Option<String>,
        display_name: String,
    },
    Message {
        text: String,
    },
    Typing {
        is_typing: bool,
    },
}

/// Chat message as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageDto {
    /// Monotonic id for client-side deduplication and ordering
    pub id: u64,
    pub room_id: String,
    pub display_name: String,
    pub text: String,
    /// Unix timestamp (milliseconds)
    pub timestamp: i64,
}

/// Outbound event sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// First frame of every connection; the id can be presented again to resume
    Connected { connection_id: String },
    History { messages: Vec<ChatMessageDto> },
    UserJoined { text: String, timestamp: i64 },
    UserLeft { text: String, timestamp: i64 },
    MemberCount { count: usize },
    Message(ChatMessageDto),
    TypingState { display_name: String, is_typing: bool },
    Error { code: String, message: String },
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
