//! Infrastructure 層
//!
//! - `dto`: ワイヤーフォーマット（WebSocket / HTTP）
//! - `message_pusher`: `MessagePusher` trait の具体的な実装

pub mod dto;
pub mod message_pusher;
