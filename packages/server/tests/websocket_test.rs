//! Integration tests driving the router over real WebSocket connections.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hiroba_server::{
    config::{CoordinatorConfig, LeaveMode},
    domain::RoomId,
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::Server,
    usecase::SessionCoordinator,
};
use hiroba_shared::time::SystemClock;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server on an ephemeral port
async fn spawn_server(leave_mode: LeaveMode) -> SocketAddr {
    let message_pusher = Arc::new(WebSocketMessagePusher::default());
    let coordinator = Arc::new(SessionCoordinator::new(
        message_pusher.clone(),
        Arc::new(SystemClock),
        CoordinatorConfig {
            leave_mode,
            history_capacity: 100,
        },
    ));
    let server = Server::new(
        coordinator,
        message_pusher,
        RoomId::new("general".to_string()).unwrap(),
    );
    let app = server.router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Helper struct for one WebSocket client
struct TestClient {
    socket: Socket,
    connection_id: String,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let (socket, _response) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        Self::handshake(socket).await
    }

    /// Reconnect presenting a previous connection id, retrying until the
    /// server has processed the disconnect of the old socket.
    async fn reconnect(addr: SocketAddr, connection_id: &str) -> Self {
        for _ in 0..50 {
            let url = format!("ws://{addr}/ws?connection_id={connection_id}");
            if let Ok((socket, _response)) = connect_async(url).await {
                let client = Self::handshake(socket).await;
                if client.connection_id == connection_id {
                    return client;
                }
                client.close().await;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("could not reclaim connection id {connection_id}");
    }

    async fn handshake(socket: Socket) -> Self {
        let mut client = Self {
            socket,
            connection_id: String::new(),
        };
        let connected = client.next_event().await;
        assert_eq!(connected["type"], "connected");
        client.connection_id = connected["connection_id"].as_str().unwrap().to_string();
        client
    }

    async fn send(&mut self, event: Value) {
        self.socket
            .send(Message::Text(event.to_string().into()))
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, frame: &str) {
        self.socket
            .send(Message::Text(frame.to_string().into()))
            .await
            .unwrap();
    }

    async fn join(&mut self, room_id: &str, display_name: &str) {
        self.send(json!({"type": "join", "room_id": room_id, "display_name": display_name}))
            .await;
    }

    async fn next_event(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.socket.next())
                .await
                .expect("timed out waiting for an event")
                .expect("socket closed")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).unwrap();
            }
        }
    }

    async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}

#[tokio::test]
async fn test_join_message_and_member_count_flow() {
    // テスト項目: A, B の参加と A の発言が正しい相手に届く
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let mut alice = TestClient::connect(addr).await;
    alice.join("r1", "A").await;
    let history = alice.next_event().await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["messages"], json!([]));
    assert_eq!(alice.next_event().await, json!({"type": "member-count", "count": 1}));

    // when (操作): B が参加
    let mut bob = TestClient::connect(addr).await;
    bob.join("r1", "B").await;

    // then (期待する結果):
    let joined = alice.next_event().await;
    assert_eq!(joined["type"], "user-joined");
    assert_eq!(joined["text"], "B joined the chat");
    assert_eq!(alice.next_event().await, json!({"type": "member-count", "count": 2}));
    assert_eq!(bob.next_event().await["type"], "history");
    assert_eq!(bob.next_event().await, json!({"type": "member-count", "count": 2}));

    // when (操作): A が発言
    alice.send(json!({"type": "message", "text": "hi"})).await;

    // then (期待する結果): 送信者を含む両者に届く
    for client in [&mut alice, &mut bob] {
        let message = client.next_event().await;
        assert_eq!(message["type"], "message");
        assert_eq!(message["display_name"], "A");
        assert_eq!(message["text"], "hi");
        assert_eq!(message["room_id"], "r1");
    }
}

#[tokio::test]
async fn test_typing_is_relayed_to_others_only() {
    // テスト項目: typing は他のメンバーにのみ届き、送信者には返らない
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let mut alice = TestClient::connect(addr).await;
    alice.join("r1", "A").await;
    alice.next_event().await;
    alice.next_event().await;
    let mut bob = TestClient::connect(addr).await;
    bob.join("r1", "B").await;
    bob.next_event().await;
    bob.next_event().await;
    alice.next_event().await;
    alice.next_event().await;

    // when (操作):
    alice.send(json!({"type": "typing", "is_typing": true})).await;
    alice.send(json!({"type": "message", "text": "done"})).await;

    // then (期待する結果):
    assert_eq!(
        bob.next_event().await,
        json!({"type": "typing-state", "display_name": "A", "is_typing": true})
    );
    assert_eq!(alice.next_event().await["type"], "message");
}

#[tokio::test]
async fn test_immediate_disconnect_notifies_remaining_members() {
    // テスト項目: 即時モードでは切断と同時に退室通知と人数が届く
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let mut alice = TestClient::connect(addr).await;
    alice.join("r1", "A").await;
    alice.next_event().await;
    alice.next_event().await;
    let mut bob = TestClient::connect(addr).await;
    bob.join("r1", "B").await;
    alice.next_event().await;
    alice.next_event().await;

    // when (操作):
    bob.close().await;

    // then (期待する結果):
    let left = alice.next_event().await;
    assert_eq!(left["type"], "user-left");
    assert_eq!(left["text"], "B left the chat");
    assert_eq!(alice.next_event().await, json!({"type": "member-count", "count": 1}));
}

#[tokio::test]
async fn test_reconnect_within_grace_window_is_silent() {
    // テスト項目: 猶予期間内の再接続では他のメンバーに入退室が通知されない
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Grace(Duration::from_secs(2))).await;
    let mut alice = TestClient::connect(addr).await;
    alice.join("r1", "A").await;
    alice.next_event().await;
    alice.next_event().await;
    let mut bob = TestClient::connect(addr).await;
    bob.join("r1", "B").await;
    bob.next_event().await;
    bob.next_event().await;
    alice.next_event().await;
    alice.next_event().await;
    alice.send(json!({"type": "message", "text": "before"})).await;
    alice.next_event().await;
    bob.next_event().await;

    // when (操作): A が切断して同じ接続 ID で戻る
    let alice_id = alice.connection_id.clone();
    alice.close().await;
    let mut alice = TestClient::reconnect(addr, &alice_id).await;
    alice.join("r1", "A").await;

    // then (期待する結果): A は履歴と人数を受け取り、B には次の発言だけが届く
    let history = alice.next_event().await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["messages"][0]["text"], "before");
    assert_eq!(alice.next_event().await, json!({"type": "member-count", "count": 2}));
    alice.send(json!({"type": "message", "text": "back"})).await;
    let next = bob.next_event().await;
    assert_eq!(next["type"], "message");
    assert_eq!(next["text"], "back");
}

#[tokio::test]
async fn test_invalid_frames_are_answered_with_error_events() {
    // テスト項目: 不正なフレームにはエラーイベントが返り、接続は維持される
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let mut alice = TestClient::connect(addr).await;

    // when (操作) / then (期待する結果):
    alice.send_raw("not json").await;
    let error = alice.next_event().await;
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "malformed_frame");

    alice.join("r1", "   ").await;
    let error = alice.next_event().await;
    assert_eq!(error["code"], "invalid_payload");

    // 参加前のメッセージは黙って破棄される
    alice.send(json!({"type": "message", "text": "too early"})).await;
    alice.send(json!({"type": "join", "display_name": "A"})).await;
    let history = alice.next_event().await;
    assert_eq!(history["type"], "history");
    assert_eq!(history["messages"], json!([]));
}

#[tokio::test]
async fn test_http_room_listing() {
    // テスト項目: HTTP API でヘルスチェックとルーム一覧・詳細が取得できる
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let mut alice = TestClient::connect(addr).await;
    alice.send(json!({"type": "join", "display_name": "A"})).await;
    alice.next_event().await;
    alice.next_event().await;
    let http = reqwest::Client::new();

    // when (操作):
    let health: Value = http
        .get(format!("http://{addr}/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let rooms: Value = http
        .get(format!("http://{addr}/api/rooms"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: Value = http
        .get(format!("http://{addr}/api/rooms/general"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = http
        .get(format!("http://{addr}/api/rooms/nowhere"))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(rooms[0]["id"], "general");
    assert_eq!(rooms[0]["member_count"], 1);
    assert_eq!(detail["members"][0]["display_name"], "A");
    assert_eq!(detail["members"][0]["reconnecting"], false);
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_live_connection_id_cannot_be_claimed() {
    // テスト項目: 接続中の ID を指定した接続は拒否される
    // given (前提条件):
    let addr = spawn_server(LeaveMode::Immediate).await;
    let alice = TestClient::connect(addr).await;

    // when (操作):
    let result = connect_async(format!(
        "ws://{addr}/ws?connection_id={}",
        alice.connection_id
    ))
    .await;

    // then (期待する結果):
    assert!(result.is_err());
}
