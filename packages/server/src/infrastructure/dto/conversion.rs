//! Conversion logic between DTOs and domain entities.

use hiroba_shared::time::timestamp_to_jst_rfc3339;

use crate::{
    domain::{ChatMessage, OutboundEvent, RoomSummary, Timestamp},
    infrastructure::dto::{http, websocket as dto},
    usecase::{MemberInfo, RoomDetail},
};

fn rfc3339(timestamp: Timestamp) -> String {
    timestamp_to_jst_rfc3339(timestamp.value()).unwrap_or_default()
}

// ========================================
// Domain Entity → WebSocket DTO
// ========================================

impl From<ChatMessage> for dto::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id.value(),
            room_id: model.room_id.into_string(),
            display_name: model.display_name.into_string(),
            text: model.text.into_string(),
            timestamp: model.timestamp.value(),
        }
    }
}

impl From<OutboundEvent> for dto::ServerEvent {
    fn from(event: OutboundEvent) -> Self {
        match event {
            OutboundEvent::History(messages) => Self::History {
                messages: messages.into_iter().map(Into::into).collect(),
            },
            OutboundEvent::UserJoined { text, timestamp } => Self::UserJoined {
                text,
                timestamp: timestamp.value(),
            },
            OutboundEvent::UserLeft { text, timestamp } => Self::UserLeft {
                text,
                timestamp: timestamp.value(),
            },
            OutboundEvent::MemberCount(count) => Self::MemberCount { count },
            OutboundEvent::Message(message) => Self::Message(message.into()),
            OutboundEvent::TypingState {
                display_name,
                is_typing,
            } => Self::TypingState {
                display_name: display_name.into_string(),
                is_typing,
            },
        }
    }
}

// ========================================
// Domain Model → HTTP DTO
// ========================================

impl From<RoomSummary> for http::RoomSummaryDto {
    fn from(summary: RoomSummary) -> Self {
        Self {
            id: summary.id.into_string(),
            member_count: summary.member_count,
            history_len: summary.history_len,
            created_at: rfc3339(summary.created_at),
        }
    }
}

impl From<MemberInfo> for http::MemberDto {
    fn from(member: MemberInfo) -> Self {
        Self {
            display_name: member.display_name.into_string(),
            joined_at: rfc3339(member.joined_at),
            reconnecting: member.reconnecting,
        }
    }
}

impl From<RoomDetail> for http::RoomDetailDto {
    fn from(detail: RoomDetail) -> Self {
        Self {
            id: detail.summary.id.into_string(),
            member_count: detail.summary.member_count,
            members: detail.members.into_iter().map(Into::into).collect(),
            messages: detail.history.into_iter().map(Into::into).collect(),
            created_at: rfc3339(detail.summary.created_at),
        }
    }
}
