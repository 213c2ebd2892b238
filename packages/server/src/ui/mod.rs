//! WebSocket / HTTP delivery shell around the session coordinator.

mod error;
mod handler;
mod server;
mod signal;
pub mod state;

pub use error::FrameError;
pub use server::Server;
