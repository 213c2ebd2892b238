//! Room Registry
//!
//! 生存中のルームを保持する。ルームは最初の参加時に遅延生成され、
//! メンバーが空になった時点で即座に削除される。

use std::collections::HashMap;

use super::{
    entity::Room,
    history::DEFAULT_HISTORY_CAPACITY,
    value_object::{ConnectionId, RoomId, Timestamp},
};

/// ルーム一覧用の要約
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub member_count: usize,
    pub history_len: usize,
    pub created_at: Timestamp,
}

#[derive(Debug)]
pub struct RoomRegistry {
    rooms: HashMap<RoomId, Room>,
    history_capacity: usize,
}

impl RoomRegistry {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            history_capacity,
        }
    }

    /// ルームを取得する。存在しなければ空のメンバー・履歴で作成する
    pub fn get_or_create(&mut self, room_id: &RoomId, now: Timestamp) -> &mut Room {
        let history_capacity = self.history_capacity;
        self.rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!("Room '{}' created", room_id);
            Room::new(room_id.clone(), history_capacity, now)
        })
    }

    pub fn get(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.get(room_id)
    }

    pub fn get_mut(&mut self, room_id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(room_id)
    }

    /// メンバーが空ならルームを削除する。削除した場合 true
    pub fn remove_if_empty(&mut self, room_id: &RoomId) -> bool {
        let is_empty = self.rooms.get(room_id).is_some_and(Room::is_empty);
        if is_empty {
            self.rooms.remove(room_id);
            tracing::info!("Room '{}' removed (no members left)", room_id);
        }
        is_empty
    }

    /// ブロードキャスト対象の解決: ルームの現在のメンバー
    pub fn members_of(&self, room_id: &RoomId) -> Vec<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|room| room.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// ルーム ID 順の要約一覧
    pub fn summaries(&self) -> Vec<RoomSummary> {
        let mut summaries: Vec<RoomSummary> = self
            .rooms
            .values()
            .map(|room| RoomSummary {
                id: room.id.clone(),
                member_count: room.members.len(),
                history_len: room.history.len(),
                created_at: room.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
