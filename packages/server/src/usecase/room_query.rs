//! UseCase: ルーム一覧・詳細の取得（HTTP API 用、読み取り専用）

use crate::domain::{ChatMessage, DisplayName, RoomId, RoomSummary, Timestamp};

use super::session_coordinator::SessionCoordinator;

/// ルームのメンバー情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub display_name: DisplayName,
    pub joined_at: Timestamp,
    /// 再接続の猶予期間中か
    pub reconnecting: bool,
}

/// ルーム詳細
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDetail {
    pub summary: RoomSummary,
    pub members: Vec<MemberInfo>,
    pub history: Vec<ChatMessage>,
}

impl SessionCoordinator {
    /// 生存中のルーム一覧（ルーム ID 順）
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let state = self.lock_state().await;
        state.rooms.summaries()
    }

    /// ルーム詳細。ルームが存在しなければ `None`
    pub async fn room_detail(&self, room_id: &RoomId) -> Option<RoomDetail> {
        let state = self.lock_state().await;
        let room = state.rooms.get(room_id)?;

        // ライブなメンバー（ルームのメンバー集合）の後に猶予中のメンバーを並べる
        let live = room.members.iter().filter_map(|connection_id| {
            state
                .presence
                .get_session(connection_id)
                .map(|session| MemberInfo {
                    display_name: session.display_name.clone(),
                    joined_at: session.joined_at,
                    reconnecting: false,
                })
        });
        let pending = state
            .presence
            .grace_entries_in_room(room_id)
            .into_iter()
            .map(|entry| MemberInfo {
                display_name: entry.display_name.clone(),
                joined_at: entry.joined_at,
                reconnecting: true,
            });
        let members = live.chain(pending).collect();

        Some(RoomDetail {
            summary: RoomSummary {
                id: room.id.clone(),
                member_count: state.presence.count_in_room(room_id),
                history_len: room.history.len(),
                created_at: room.created_at,
            },
            members,
            history: room.history.snapshot(),
        })
    }
}
