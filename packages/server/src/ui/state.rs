//! Server state shared by the handlers.

use std::sync::Arc;

use crate::{
    domain::{MessagePusher, RoomId},
    usecase::SessionCoordinator,
};

/// Shared application state
pub struct AppState {
    /// SessionCoordinator（受信イベントの処理）
    pub coordinator: Arc<SessionCoordinator>,
    /// MessagePusher（接続ごとの送信チャンネルの登録）
    pub message_pusher: Arc<dyn MessagePusher>,
    /// `join` で room_id が省略された場合のルーム
    pub default_room: RoomId,
}
