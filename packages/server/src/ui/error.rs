//! Errors raised while interpreting inbound WebSocket frames.

use thiserror::Error;

use crate::domain::ValueObjectError;

/// An inbound frame that could not be turned into a coordinator event
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    Invalid(#[from] ValueObjectError),
}

impl FrameError {
    /// Machine-readable code sent back in the `error` event
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed(_) => "malformed_frame",
            Self::Invalid(_) => "invalid_payload",
        }
    }
}
