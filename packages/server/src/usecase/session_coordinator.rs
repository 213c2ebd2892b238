//! UseCase: セッションコーディネーター
//!
//! トランスポートからの受信イベント（join / message / typing / disconnect）を
//! 1 つずつ処理し、Presence Tracker と Room Registry を更新して送信指示を出します。
//!
//! ## 排他制御
//!
//! 状態（セッション・ルーム・履歴）は単一の `Mutex<ChatState>` で保護します。
//! 1 つの操作が出す送信はすべてロックを保持したまま行うため、同じルーム内では
//! 履歴への追加順とブロードキャスト順が一致します。
//!
//! ## 再接続猶予
//!
//! `LeaveMode::Grace` では切断時にセッションを削除して猶予エントリを作り、
//! 期限切れ確認のタスクを起動します。復帰時はタスクを中断しますが、
//! 中断と発火が競合した場合に備えて、発火側は必ずロック取得後に
//! 「ライブなセッションが存在するか」「猶予エントリの世代が一致するか」を確認します。

use std::{collections::HashMap, sync::Arc, time::Duration};

use hiroba_shared::time::Clock;
use tokio::{sync::Mutex, task::AbortHandle};

use crate::{
    config::{CoordinatorConfig, LeaveMode},
    domain::{
        ChatMessage, ConnectionId, DisplayName, MessageIdGenerator, MessagePusher, MessageText,
        OutboundEvent, PresenceTracker, RoomId, RoomRegistry, Timestamp, UserSession,
    },
};

/// コーディネーターが保護する状態
pub(crate) struct ChatState {
    pub(crate) presence: PresenceTracker,
    pub(crate) rooms: RoomRegistry,
    message_ids: MessageIdGenerator,
    /// 接続 ID → (猶予の世代, 期限切れタスク)
    grace_timers: HashMap<ConnectionId, (u64, AbortHandle)>,
}

impl ChatState {
    fn new(history_capacity: usize) -> Self {
        Self {
            presence: PresenceTracker::new(),
            rooms: RoomRegistry::new(history_capacity),
            message_ids: MessageIdGenerator::new(),
            grace_timers: HashMap::new(),
        }
    }

    /// ルームの配信対象（猶予中の接続と `exclude` を除く）
    fn audience(&self, room_id: &RoomId, exclude: Option<&ConnectionId>) -> Vec<ConnectionId> {
        self.rooms
            .members_of(room_id)
            .into_iter()
            .filter(|id| Some(id) != exclude && self.presence.has_session(id))
            .collect()
    }
}

/// join の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// 新規参加
    Joined,
    /// 猶予中の身元に復帰（入退室通知なし）
    Resumed,
    /// 参加中の接続が別の身元で参加し直した
    Rejoined { previous_room: RoomId },
}

/// disconnect の処理結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// セッションがなかった
    NoSession,
    /// 即時退室した
    Left,
    /// 猶予期間に入った
    GracePending { generation: u64, deadline: Timestamp },
}

/// セッションコーディネーター
pub struct SessionCoordinator {
    state: Mutex<ChatState>,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    config: CoordinatorConfig,
}

impl SessionCoordinator {
    /// 新しい SessionCoordinator を作成
    pub fn new(
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            state: Mutex::new(ChatState::new(config.history_capacity)),
            message_pusher,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub(crate) async fn lock_state(&self) -> tokio::sync::MutexGuard<'_, ChatState> {
        self.state.lock().await
    }

    /// 接続がルームに参加する
    ///
    /// 猶予中の接続 ID が同じルームに参加した場合は、以前の身元のまま
    /// 黙って復帰する。参加中の接続が再度 join した場合は、以前の身元で
    /// 退室してから新しい身元で参加する。
    pub async fn on_join(
        &self,
        connection_id: &ConnectionId,
        room_id: RoomId,
        display_name: DisplayName,
    ) -> JoinOutcome {
        let now = self.now();
        let mut state = self.state.lock().await;

        let pending_room = state
            .presence
            .check_grace(connection_id)
            .map(|entry| entry.room_id.clone());
        match pending_room {
            Some(pending) if pending == room_id => {
                self.resume(&mut state, connection_id, now).await;
                return JoinOutcome::Resumed;
            }
            Some(pending) => {
                // 別ルームへの参加: 保留中の退室を確定させてから新規参加
                tracing::debug!(
                    "'{}' joined '{}' while pending in '{}'; finalizing leave",
                    connection_id,
                    room_id,
                    pending
                );
                if let Some(entry) = state.presence.cancel_grace(connection_id) {
                    Self::abort_timer(&mut state, connection_id);
                    self.announce_departure(
                        &mut state,
                        connection_id,
                        &entry.display_name,
                        &entry.room_id,
                        now,
                    )
                    .await;
                    Self::release_if_abandoned(&mut state, &entry.room_id);
                }
            }
            None => {}
        }

        let previous_room = match state.presence.delete_session(connection_id) {
            Some(previous) => {
                tracing::info!(
                    "'{}' re-joined; leaving '{}' as '{}' first",
                    connection_id,
                    previous.room_id,
                    previous.display_name
                );
                self.announce_departure(
                    &mut state,
                    connection_id,
                    &previous.display_name,
                    &previous.room_id,
                    now,
                )
                .await;
                Some(previous.room_id)
            }
            None => None,
        };

        state.presence.create_session(UserSession::new(
            connection_id.clone(),
            display_name.clone(),
            room_id.clone(),
            now,
        ));
        let room = state.rooms.get_or_create(&room_id, now);
        room.add_member(connection_id.clone());
        let history = room.history.snapshot();
        // 同じルームへの再参加ではルームと履歴をそのまま引き継ぐ
        if let Some(previous_room) = previous_room.as_ref().filter(|prev| **prev != room_id) {
            Self::release_if_abandoned(&mut state, previous_room);
        }

        tracing::info!(
            "'{}' joined room '{}' as '{}' ({} messages in history)",
            connection_id,
            room_id,
            display_name,
            history.len()
        );

        self.unicast(connection_id, OutboundEvent::History(history))
            .await;
        let others = state.audience(&room_id, Some(connection_id));
        self.broadcast(others, OutboundEvent::user_joined(&display_name, now))
            .await;
        self.broadcast_member_count(&state, &room_id).await;

        match previous_room {
            Some(previous_room) => JoinOutcome::Rejoined { previous_room },
            None => JoinOutcome::Joined,
        }
    }

    /// チャットメッセージを受け付け、履歴に追加してルーム全員に配信する
    ///
    /// 未参加の接続からのメッセージは黙って破棄し `None` を返す。
    pub async fn on_message(
        &self,
        connection_id: &ConnectionId,
        text: MessageText,
    ) -> Option<ChatMessage> {
        let now = self.now();
        let mut state = self.state.lock().await;

        let Some(session) = state.presence.get_session(connection_id).cloned() else {
            tracing::debug!("Dropped message from unjoined connection '{}'", connection_id);
            return None;
        };

        let id = state.message_ids.next(now);
        let message = ChatMessage::new(
            id,
            session.room_id.clone(),
            session.display_name,
            text,
            now,
        );

        let Some(room) = state.rooms.get_mut(&session.room_id) else {
            tracing::warn!(
                "Room '{}' of session '{}' is missing; message dropped",
                session.room_id,
                connection_id
            );
            return None;
        };
        if let Some(evicted) = room.history.append(message.clone()) {
            tracing::debug!(
                "Evicted message {} from room '{}' history",
                evicted.id.value(),
                session.room_id
            );
        }

        let audience = state.audience(&session.room_id, None);
        self.broadcast(audience, OutboundEvent::Message(message.clone()))
            .await;

        Some(message)
    }

    /// 入力中状態を送信者以外のメンバーに中継する（状態は保持しない）
    ///
    /// 中継した場合 true
    pub async fn on_typing(&self, connection_id: &ConnectionId, is_typing: bool) -> bool {
        let state = self.state.lock().await;

        let Some(session) = state.presence.get_session(connection_id) else {
            tracing::debug!("Dropped typing signal from unjoined connection '{}'", connection_id);
            return false;
        };

        let others = state.audience(&session.room_id, Some(connection_id));
        self.broadcast(
            others,
            OutboundEvent::TypingState {
                display_name: session.display_name.clone(),
                is_typing,
            },
        )
        .await;
        true
    }

    /// 接続の切断を処理する
    ///
    /// セッションがなければ何もしない（冪等）。
    pub async fn on_disconnect(
        self: &Arc<Self>,
        connection_id: &ConnectionId,
        reason: &str,
    ) -> DisconnectOutcome {
        let now = self.now();
        let mut state = self.state.lock().await;

        self.message_pusher.unregister_client(connection_id).await;

        let Some(session) = state.presence.delete_session(connection_id) else {
            tracing::debug!(
                "'{}' disconnected without a session ({})",
                connection_id,
                reason
            );
            return DisconnectOutcome::NoSession;
        };

        match self.config.leave_mode {
            LeaveMode::Immediate => {
                tracing::info!(
                    "'{}' ({}) left room '{}': {}",
                    connection_id,
                    session.display_name,
                    session.room_id,
                    reason
                );
                self.announce_departure(
                    &mut state,
                    connection_id,
                    &session.display_name,
                    &session.room_id,
                    now,
                )
                .await;
                Self::release_if_abandoned(&mut state, &session.room_id);
                DisconnectOutcome::Left
            }
            LeaveMode::Grace(period) => {
                let deadline = Timestamp::new(now.value().saturating_add(duration_millis(period)));
                tracing::info!(
                    "'{}' ({}) disconnected from room '{}': {}; holding presence for {:?}",
                    connection_id,
                    session.display_name,
                    session.room_id,
                    reason,
                    period
                );
                // 猶予中の接続はメンバー集合から外す（ルームは猶予エントリで維持される）
                if let Some(room) = state.rooms.get_mut(&session.room_id) {
                    room.remove_member(connection_id);
                }
                let generation = state.presence.create_grace(session, deadline);

                let coordinator = Arc::clone(self);
                let pending_id = connection_id.clone();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(period).await;
                    coordinator.expire_grace(&pending_id, generation).await;
                });
                if let Some((_, stale)) = state
                    .grace_timers
                    .insert(connection_id.clone(), (generation, timer.abort_handle()))
                {
                    stale.abort();
                }

                DisconnectOutcome::GracePending {
                    generation,
                    deadline,
                }
            }
        }
    }

    /// 猶予期間の期限切れ処理
    ///
    /// 復帰済み（ライブなセッションがある）または世代が一致しなければ何もしない。
    /// 退室を確定した場合 true
    pub async fn expire_grace(&self, connection_id: &ConnectionId, generation: u64) -> bool {
        let now = self.now();
        let mut state = self.state.lock().await;

        if state
            .grace_timers
            .get(connection_id)
            .is_some_and(|(timer_generation, _)| *timer_generation == generation)
        {
            state.grace_timers.remove(connection_id);
        }

        if state.presence.has_session(connection_id) {
            tracing::debug!("'{}' resumed before grace expiry", connection_id);
            return false;
        }
        let Some(entry) = state
            .presence
            .take_grace_if_generation(connection_id, generation)
        else {
            return false;
        };

        tracing::info!(
            "'{}' ({}) did not reconnect; leaving room '{}'",
            connection_id,
            entry.display_name,
            entry.room_id
        );
        self.announce_departure(
            &mut state,
            connection_id,
            &entry.display_name,
            &entry.room_id,
            now,
        )
        .await;
        Self::release_if_abandoned(&mut state, &entry.room_id);
        true
    }

    /// 接続 ID に猶予中のエントリがあるか（トランスポートが ID の再利用可否を判断する）
    pub async fn has_pending_grace(&self, connection_id: &ConnectionId) -> bool {
        let state = self.state.lock().await;
        !state.presence.has_session(connection_id)
            && state.presence.check_grace(connection_id).is_some()
    }

    /// ルームの在室人数
    pub async fn member_count(&self, room_id: &RoomId) -> usize {
        let state = self.state.lock().await;
        state.presence.count_in_room(room_id)
    }

    async fn resume(&self, state: &mut ChatState, connection_id: &ConnectionId, now: Timestamp) {
        let Some(entry) = state.presence.cancel_grace(connection_id) else {
            return;
        };
        Self::abort_timer(state, connection_id);

        let room_id = entry.room_id.clone();
        tracing::info!(
            "'{}' ({}) resumed in room '{}'",
            connection_id,
            entry.display_name,
            room_id
        );
        state.presence.create_session(entry.into_session());
        let room = state.rooms.get_or_create(&room_id, now);
        room.add_member(connection_id.clone());
        let history = room.history.snapshot();

        self.unicast(connection_id, OutboundEvent::History(history))
            .await;
        self.unicast(
            connection_id,
            OutboundEvent::MemberCount(state.presence.count_in_room(&room_id)),
        )
        .await;
    }

    /// セッション削除済みの接続をルームから外し、退室通知と人数を配信する
    ///
    /// 空になったルームの削除は呼び出し側が `release_if_abandoned` で行う。
    async fn announce_departure(
        &self,
        state: &mut ChatState,
        connection_id: &ConnectionId,
        display_name: &DisplayName,
        room_id: &RoomId,
        now: Timestamp,
    ) {
        match state.rooms.get_mut(room_id) {
            Some(room) => {
                room.remove_member(connection_id);
            }
            None => {
                tracing::warn!(
                    "Room '{}' of departing '{}' is missing",
                    room_id,
                    connection_id
                );
                return;
            }
        }

        let remaining = state.audience(room_id, None);
        self.broadcast(remaining, OutboundEvent::user_left(display_name, now))
            .await;
        self.broadcast_member_count(state, room_id).await;
    }

    /// メンバーが空で猶予中のエントリも残っていなければルームを削除する
    fn release_if_abandoned(state: &mut ChatState, room_id: &RoomId) {
        if !state.presence.has_grace_in_room(room_id) {
            state.rooms.remove_if_empty(room_id);
        }
    }

    fn abort_timer(state: &mut ChatState, connection_id: &ConnectionId) {
        if let Some((_, timer)) = state.grace_timers.remove(connection_id) {
            timer.abort();
        }
    }

    async fn broadcast_member_count(&self, state: &ChatState, room_id: &RoomId) {
        let count = state.presence.count_in_room(room_id);
        let audience = state.audience(room_id, None);
        self.broadcast(audience, OutboundEvent::MemberCount(count))
            .await;
    }

    async fn unicast(&self, connection_id: &ConnectionId, event: OutboundEvent) {
        if let Err(e) = self.message_pusher.push_to(connection_id, &event).await {
            tracing::warn!(
                "Failed to push {} to '{}': {}",
                event.name(),
                connection_id,
                e
            );
        }
    }

    async fn broadcast(&self, targets: Vec<ConnectionId>, event: OutboundEvent) {
        if targets.is_empty() {
            return;
        }
        if let Err(e) = self.message_pusher.broadcast(targets, &event).await {
            tracing::warn!("Failed to broadcast {}: {}", event.name(), e);
        }
    }
}

fn duration_millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
