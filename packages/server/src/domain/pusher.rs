//! MessagePusher trait 定義
//!
//! クライアントへのイベント送信（通知）を抽象化します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{error::MessagePushError, event::OutboundEvent, value_object::ConnectionId};

/// 接続ごとの送信チャンネル（シリアライズ済みフレームを流す）
pub type PusherChannel = mpsc::UnboundedSender<String>;

/// MessagePusher trait
///
/// UseCase 層はこの trait に依存し、WebSocket などの具体的な送信手段には依存しない。
/// 送信は fire-and-forget で、配信確認は待たない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// 接続の送信チャンネルを登録
    ///
    /// 同じ接続 ID が既に登録されていれば何もせず false を返す。
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) -> bool;

    /// 接続の送信チャンネルを登録解除
    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// 接続が登録済みか
    async fn is_registered(&self, connection_id: &ConnectionId) -> bool;

    /// 特定の接続にイベントを送信（unicast）
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数の接続にイベントを送信
    ///
    /// 一部の送信失敗は許容し、実装側でログに残す。
    async fn broadcast(
        &self,
        targets: Vec<ConnectionId>,
        event: &OutboundEvent,
    ) -> Result<(), MessagePushError>;
}
