//! WebSocket connection handlers.
//!
//! Each socket is bound to one `ConnectionId`. Inbound frames are decoded into
//! coordinator events; outbound frames arrive through the channel registered
//! with the `MessagePusher`.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, DisplayName, MessageText, PusherChannel, RoomId},
    infrastructure::{
        dto::websocket::{ClientEvent, ServerEvent},
        message_pusher::websocket::encode_event,
    },
    ui::{error::FrameError, state::AppState},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Identifier of a previous connection to resume
    pub connection_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let connection_id = resolve_connection_id(&state, query.connection_id).await?;
    tracing::info!("Connection '{}' accepted", connection_id);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, connection_id)))
}

/// Decide which identifier the new socket gets.
///
/// A presented identifier is reused only while it has a pending grace entry;
/// otherwise a fresh one is assigned. A presented identifier that still has
/// a live socket is rejected.
async fn resolve_connection_id(
    state: &AppState,
    requested: Option<String>,
) -> Result<ConnectionId, StatusCode> {
    let Some(raw) = requested else {
        return Ok(ConnectionId::generate());
    };
    let requested = ConnectionId::try_from(raw).map_err(|e| {
        tracing::warn!("Invalid connection_id: {}", e);
        StatusCode::BAD_REQUEST
    })?;

    if state.message_pusher.is_registered(&requested).await {
        tracing::warn!(
            "Connection '{}' is still live. Rejecting connection.",
            requested
        );
        return Err(StatusCode::CONFLICT);
    }
    if state.coordinator.has_pending_grace(&requested).await {
        tracing::info!("Connection '{}' is reclaiming its identity", requested);
        Ok(requested)
    } else {
        tracing::debug!(
            "Connection '{}' has nothing to resume; assigning a new id",
            requested
        );
        Ok(ConnectionId::generate())
    }
}

/// Spawns a task that forwards frames from the rx channel to the WebSocket sink.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

/// Queue an event for the socket. Returns false when the frame was dropped.
fn send_event(tx: &PusherChannel, event: &ServerEvent) -> bool {
    match encode_event(event) {
        Ok(frame) => match tx.send(frame) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Dropped frame for a closing socket: {}", e);
                false
            }
        },
        Err(e) => {
            tracing::error!("Failed to encode event: {}", e);
            false
        }
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connection_id: ConnectionId) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    if !state
        .message_pusher
        .register_client(connection_id.clone(), tx.clone())
        .await
    {
        if let Ok(frame) = encode_event(&ServerEvent::error(
            "connection_id_in_use",
            "connection id is already in use",
        )) {
            if let Err(e) = sender.send(Message::Text(frame.into())).await {
                tracing::debug!("Failed to send rejection to '{}': {}", connection_id, e);
            }
        }
        return;
    }

    send_event(
        &tx,
        &ServerEvent::Connected {
            connection_id: connection_id.to_string(),
        },
    );

    let mut send_task = pusher_loop(rx, sender);

    let recv_state = state.clone();
    let recv_connection_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    tracing::debug!("Received from '{}': {}", recv_connection_id, text.as_str());
                    if let Err(e) = handle_frame(&recv_state, &recv_connection_id, text.as_str()).await
                    {
                        tracing::warn!("Rejected frame from '{}': {}", recv_connection_id, e);
                        send_event(&tx, &ServerEvent::error(e.code(), e.to_string()));
                    }
                }
                Ok(Message::Close(_)) => return "client closed the connection".to_string(),
                // Ping/pong is handled automatically by the WebSocket protocol
                Ok(_) => {}
                Err(e) => return format!("websocket error: {e}"),
            }
        }
        "stream ended".to_string()
    });

    // If any one of the tasks completes, abort the other
    let reason = tokio::select! {
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or_else(|e| format!("receive task failed: {e}"))
        }
        _ = &mut send_task => {
            recv_task.abort();
            "send channel closed".to_string()
        }
    };

    let outcome = state.coordinator.on_disconnect(&connection_id, &reason).await;
    tracing::info!("Connection '{}' closed: {:?}", connection_id, outcome);
}

/// Decode one inbound frame and dispatch it to the coordinator.
async fn handle_frame(
    state: &AppState,
    connection_id: &ConnectionId,
    text: &str,
) -> Result<(), FrameError> {
    match serde_json::from_str::<ClientEvent>(text)? {
        ClientEvent::Join {
            room_id,
            display_name,
        } => {
            let room_id = match room_id {
                Some(raw) => RoomId::new(raw)?,
                None => state.default_room.clone(),
            };
            let display_name = DisplayName::new(display_name)?;
            let outcome = state
                .coordinator
                .on_join(connection_id, room_id, display_name)
                .await;
            tracing::debug!("Join of '{}': {:?}", connection_id, outcome);
        }
        ClientEvent::Message { text } => {
            let text = MessageText::new(text)?;
            state.coordinator.on_message(connection_id, text).await;
        }
        ClientEvent::Typing { is_typing } => {
            state.coordinator.on_typing(connection_id, is_typing).await;
        }
    }
    Ok(())
}
