//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `UnboundedSender` を管理
//! - `OutboundEvent` を JSON フレームに変換して送信（push_to, broadcast）
//!
//! WebSocket 接続の受付と sender の生成は UI 層（`ui::handler::websocket`）で行い、
//! この実装は受け取った sender を送信にのみ使用します。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, OutboundEvent, PusherChannel},
    infrastructure::dto::websocket::ServerEvent,
};

/// 送信イベントを JSON フレームにシリアライズする
pub fn encode_event(event: &ServerEvent) -> Result<String, MessagePushError> {
    serde_json::to_string(event).map_err(|e| MessagePushError::PushFailed(e.to_string()))
}

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new(Arc::new(Mutex::new(HashMap::new())));
/// pusher.register_client(connection_id.clone(), tx).await;
/// pusher.push_to(&connection_id, &OutboundEvent::MemberCount(1)).await?;
/// ```
pub struct WebSocketMessagePusher {
    /// 接続中のクライアントの WebSocket sender
    clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>,
}

impl WebSocketMessagePusher {
    pub fn new(clients: Arc<Mutex<HashMap<ConnectionId, PusherChannel>>>) -> Self {
        Self { clients }
    }
}

impl Default for WebSocketMessagePusher {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(HashMap::new())))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(&connection_id) {
            tracing::warn!("Connection '{}' is already registered", connection_id);
            return false;
        }
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
        clients.insert(connection_id, sender);
        true
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        let mut clients = self.clients.lock().await;
        if clients.remove(connection_id).is_some() {
            tracing::debug!("Connection '{}' unregistered from MessagePusher", connection_id);
        }
    }

    async fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.clients.lock().await.contains_key(connection_id)
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        let frame = encode_event(&ServerEvent::from(event.clone()))?;
        let clients = self.clients.lock().await;

        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))?;
        tracing::debug!("Pushed {} to '{}'", event.name(), connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError> {
        let frame = encode_event(&ServerEvent::from(event.clone()))?;
        let clients = self.clients.lock().await;

        for target in targets {
            match clients.get(&target) {
                // ブロードキャストでは一部の送信失敗を許容
                Some(sender) => {
                    if let Err(e) = sender.send(frame.clone()) {
                        tracing::warn!("Failed to push {} to '{}': {}", event.name(), target, e);
                    }
                }
                None => {
                    tracing::warn!(
                        "Connection '{}' not found during broadcast of {}, skipping",
                        target,
                        event.name()
                    );
                }
            }
        }
        tracing::debug!("Broadcasted {}", event.name());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - push_to: 特定の接続への送信と JSON 形式
    // - broadcast: 複数接続への送信と部分失敗の許容
    // - register_client: 同じ接続 ID の二重登録の拒否
    // ========================================

    fn connection(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定の接続に JSON フレームを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        pusher.register_client(connection("alice"), tx).await;

        // when (操作):
        let result = pusher
            .push_to(&connection("alice"), &OutboundEvent::MemberCount(3))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(
            rx.recv().await,
            Some(r#"{"type":"member-count","count":3}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 登録されていない接続への送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();

        // when (操作):
        let result = pusher
            .push_to(&connection("nobody"), &OutboundEvent::MemberCount(0))
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::ClientNotFound("nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn test_push_to_closed_channel_fails() {
        // テスト項目: 受信側が閉じたチャンネルへの送信は PushFailed になる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();
        let (tx, rx) = mpsc::unbounded_channel();
        pusher.register_client(connection("alice"), tx).await;
        drop(rx);

        // when (操作):
        let result = pusher
            .push_to(&connection("alice"), &OutboundEvent::MemberCount(1))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::PushFailed(_))));
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: ブロードキャスト時、一部の接続が存在しなくても他には届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        pusher.register_client(connection("alice"), tx1).await;
        pusher.register_client(connection("bob"), tx2).await;

        // when (操作):
        let targets = vec![connection("alice"), connection("ghost"), connection("bob")];
        let result = pusher
            .broadcast(targets, &OutboundEvent::MemberCount(2))
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        let expected = Some(r#"{"type":"member-count","count":2}"#.to_string());
        assert_eq!(rx1.recv().await, expected);
        assert_eq!(rx2.recv().await, expected);
    }

    #[tokio::test]
    async fn test_register_client_rejects_duplicate() {
        // テスト項目: 登録済みの接続 ID は二重登録できず、最初の sender が残る
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        assert!(pusher.register_client(connection("alice"), tx1).await);

        // when (操作):
        let registered = pusher.register_client(connection("alice"), tx2).await;
        pusher
            .push_to(&connection("alice"), &OutboundEvent::MemberCount(1))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(!registered);
        assert!(rx1.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unregister_client() {
        // テスト項目: 登録解除後は未登録として扱われる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        pusher.register_client(connection("alice"), tx).await;

        // when (操作):
        pusher.unregister_client(&connection("alice")).await;

        // then (期待する結果):
        assert!(!pusher.is_registered(&connection("alice")).await);
    }
}
