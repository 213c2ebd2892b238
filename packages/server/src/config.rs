//! Runtime configuration.

use std::time::Duration;

use crate::domain::{DEFAULT_HISTORY_CAPACITY, RoomId};

/// Default reconnect grace window.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Room used when a `join` event carries no room id.
pub const DEFAULT_ROOM: &str = "general";

/// What happens to a session when its connection drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveMode {
    /// Leave is announced as soon as the connection drops.
    Immediate,
    /// Leave is announced only if the identity is not resumed within the window.
    Grace(Duration),
}

impl Default for LeaveMode {
    fn default() -> Self {
        Self::Grace(DEFAULT_GRACE_PERIOD)
    }
}

/// Settings of the session coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    pub leave_mode: LeaveMode,
    /// Messages retained per room
    pub history_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            leave_mode: LeaveMode::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Settings of the whole server process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub default_room: RoomId,
    pub coordinator: CoordinatorConfig,
}
