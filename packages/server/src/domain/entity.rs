//! エンティティ
//!
//! - `ChatMessage`: 作成後は不変のチャットメッセージ
//! - `UserSession`: 接続とユーザー（表示名・ルーム）の対応
//! - `GraceEntry`: 切断後の再接続猶予期間中だけ存在する一時的な記録
//! - `Room`: メンバー集合とメッセージ履歴を持つブロードキャスト単位

use std::collections::BTreeSet;

use super::{
    history::HistoryBuffer,
    value_object::{ConnectionId, DisplayName, MessageId, MessageText, RoomId, Timestamp},
};

/// チャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub room_id: RoomId,
    pub display_name: DisplayName,
    pub text: MessageText,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        room_id: RoomId,
        display_name: DisplayName,
        text: MessageText,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id,
            room_id,
            display_name,
            text,
            timestamp,
        }
    }
}

/// ユーザーセッション
///
/// 接続 1 つにつき高々 1 つ存在する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSession {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    pub room_id: RoomId,
    pub joined_at: Timestamp,
}

impl UserSession {
    pub fn new(
        connection_id: ConnectionId,
        display_name: DisplayName,
        room_id: RoomId,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            connection_id,
            display_name,
            room_id,
            joined_at,
        }
    }
}

/// 再接続猶予エントリ
///
/// `generation` は同じ接続 ID で猶予が繰り返された場合に、古いタイマーが
/// 新しいエントリを期限切れにしないための識別子。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceEntry {
    pub connection_id: ConnectionId,
    pub display_name: DisplayName,
    pub room_id: RoomId,
    pub joined_at: Timestamp,
    pub deadline: Timestamp,
    pub generation: u64,
}

impl GraceEntry {
    /// 切断されたセッションから猶予エントリを作る
    pub fn from_session(session: UserSession, deadline: Timestamp, generation: u64) -> Self {
        Self {
            connection_id: session.connection_id,
            display_name: session.display_name,
            room_id: session.room_id,
            joined_at: session.joined_at,
            deadline,
            generation,
        }
    }

    /// 猶予中の身元でセッションを復元する
    pub fn into_session(self) -> UserSession {
        UserSession::new(
            self.connection_id,
            self.display_name,
            self.room_id,
            self.joined_at,
        )
    }
}

/// チャットルーム
///
/// ## 不変条件
///
/// `members` はこのルームに属するライブなセッションを持つ接続 ID の集合である。
/// 猶予中の接続は含まない（ルームの存続は猶予エントリ側で判断する）。
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub members: BTreeSet<ConnectionId>,
    pub history: HistoryBuffer,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(id: RoomId, history_capacity: usize, created_at: Timestamp) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            history: HistoryBuffer::new(history_capacity),
            created_at,
        }
    }

    /// メンバーを追加する。既に含まれていれば false
    pub fn add_member(&mut self, connection_id: ConnectionId) -> bool {
        self.members.insert(connection_id)
    }

    /// メンバーを削除する。含まれていなければ false
    pub fn remove_member(&mut self, connection_id: &ConnectionId) -> bool {
        self.members.remove(connection_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
