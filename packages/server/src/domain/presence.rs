//! Presence Tracker
//!
//! 接続 ID → セッションの対応と、再接続猶予エントリの表を保持する純粋な写像。
//! タイマーの管理は持たず、`SessionCoordinator` が担う。

use std::collections::HashMap;

use super::{
    entity::{GraceEntry, UserSession},
    value_object::{ConnectionId, RoomId, Timestamp},
};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    sessions: HashMap<ConnectionId, UserSession>,
    grace_entries: HashMap<ConnectionId, GraceEntry>,
    next_generation: u64,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// セッションを登録する。同じ接続 ID の既存セッションは置き換えて返す
    pub fn create_session(&mut self, session: UserSession) -> Option<UserSession> {
        self.sessions.insert(session.connection_id.clone(), session)
    }

    pub fn get_session(&self, connection_id: &ConnectionId) -> Option<&UserSession> {
        self.sessions.get(connection_id)
    }

    pub fn has_session(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.contains_key(connection_id)
    }

    pub fn delete_session(&mut self, connection_id: &ConnectionId) -> Option<UserSession> {
        self.sessions.remove(connection_id)
    }

    /// 猶予エントリを作成し、その世代番号を返す
    pub fn create_grace(&mut self, session: UserSession, deadline: Timestamp) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        let entry = GraceEntry::from_session(session, deadline, generation);
        self.grace_entries
            .insert(entry.connection_id.clone(), entry);
        generation
    }

    /// 猶予エントリが存在するか
    pub fn check_grace(&self, connection_id: &ConnectionId) -> Option<&GraceEntry> {
        self.grace_entries.get(connection_id)
    }

    /// 猶予エントリを取り消して返す（再接続による復帰時）
    pub fn cancel_grace(&mut self, connection_id: &ConnectionId) -> Option<GraceEntry> {
        self.grace_entries.remove(connection_id)
    }

    /// 指定した世代の猶予エントリのみを取り出す（期限切れ処理用）
    pub fn take_grace_if_generation(
        &mut self,
        connection_id: &ConnectionId,
        generation: u64,
    ) -> Option<GraceEntry> {
        match self.grace_entries.get(connection_id) {
            Some(entry) if entry.generation == generation => {
                self.grace_entries.remove(connection_id)
            }
            _ => None,
        }
    }

    /// ルームの在室人数
    ///
    /// 毎回ライブなセッションから導出する。猶予中のエントリは数えない。
    pub fn count_in_room(&self, room_id: &RoomId) -> usize {
        self.sessions
            .values()
            .filter(|session| &session.room_id == room_id)
            .count()
    }

    /// ルームに属する猶予中エントリ（接続 ID 順）
    pub fn grace_entries_in_room(&self, room_id: &RoomId) -> Vec<&GraceEntry> {
        let mut entries: Vec<&GraceEntry> = self
            .grace_entries
            .values()
            .filter(|entry| &entry.room_id == room_id)
            .collect();
        entries.sort_by(|a, b| a.connection_id.cmp(&b.connection_id));
        entries
    }

    /// ルームに猶予中のエントリが残っているか
    pub fn has_grace_in_room(&self, room_id: &RoomId) -> bool {
        self.grace_entries
            .values()
            .any(|entry| &entry.room_id == room_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn grace_count(&self) -> usize {
        self.grace_entries.len()
    }
}
