//! Real-time presence and message-relay coordinator for multi-room chat.
//!
//! Tracks which connection belongs to which room under which display name,
//! relays messages and typing signals, keeps a bounded history per room for
//! late joiners, and holds presence through brief reconnects.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
