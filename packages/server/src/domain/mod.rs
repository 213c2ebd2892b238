//! Domain layer for the presence coordinator.
//!
//! This module contains the chat state model (sessions, rooms, history) and
//! the outbound seam, independent of DTOs and transport concerns.

pub mod entity;
pub mod error;
pub mod event;
pub mod history;
pub mod presence;
pub mod pusher;
pub mod registry;
pub mod value_object;

pub use entity::{ChatMessage, GraceEntry, Room, UserSession};
pub use error::{MessagePushError, ValueObjectError};
pub use event::OutboundEvent;
pub use history::{DEFAULT_HISTORY_CAPACITY, HistoryBuffer};
pub use presence::PresenceTracker;
pub use pusher::{MessagePusher, PusherChannel};
pub use registry::{RoomRegistry, RoomSummary};
pub use value_object::{
    ConnectionId, DisplayName, MessageId, MessageIdGenerator, MessageText, RoomId, Timestamp,
};

#[cfg(test)]
pub use pusher::MockMessagePusher;
