//! Outbound events produced by the session coordinator.

use super::{
    entity::ChatMessage,
    value_object::{DisplayName, Timestamp},
};

/// An event to be delivered to one connection or a room audience.
///
/// The transport decides the wire format; see
/// `infrastructure::dto::websocket::ServerEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Room history snapshot, oldest first. Unicast to the joiner.
    History(Vec<ChatMessage>),
    /// System notice. Sent to the room, excluding the joiner.
    UserJoined { text: String, timestamp: Timestamp },
    /// System notice. Sent to the remaining room members.
    UserLeft { text: String, timestamp: Timestamp },
    /// Recomputed member count. Sent to the entire room.
    MemberCount(usize),
    /// Chat message. Sent to the entire room including the sender.
    Message(ChatMessage),
    /// Transient typing signal. Sent to the room, excluding the sender.
    TypingState {
        display_name: DisplayName,
        is_typing: bool,
    },
}

impl OutboundEvent {
    pub fn user_joined(display_name: &DisplayName, timestamp: Timestamp) -> Self {
        Self::UserJoined {
            text: format!("{display_name} joined the chat"),
            timestamp,
        }
    }

    pub fn user_left(display_name: &DisplayName, timestamp: Timestamp) -> Self {
        Self::UserLeft {
            text: format!("{display_name} left the chat"),
            timestamp,
        }
    }

    /// Event name on the wire, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::History(_) => "history",
            Self::UserJoined { .. } => "user-joined",
            Self::UserLeft { .. } => "user-left",
            Self::MemberCount(_) => "member-count",
            Self::Message(_) => "message",
            Self::TypingState { .. } => "typing-state",
        }
    }
}
