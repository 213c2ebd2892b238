//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::ChatMessageDto;

/// Entry of `GET /api/rooms`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub member_count: usize,
    pub history_len: usize,
    /// RFC 3339 (JST)
    pub created_at: String,
}

/// Member entry of `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    pub display_name: String,
    /// RFC 3339 (JST)
    pub joined_at: String,
    pub reconnecting: bool,
}

/// Response of `GET /api/rooms/{room_id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub member_count: usize,
    pub members: Vec<MemberDto>,
    pub messages: Vec<ChatMessageDto>,
    /// RFC 3339 (JST)
    pub created_at: String,
}
