//! Channel error types.

use crate::protocol::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to spawn tool host: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("channel not initialized")]
    NotInitialized,

    #[error("channel closed")]
    Closed,

    #[error("tool host exited unexpectedly")]
    HostExited,

    #[error("timeout waiting for response")]
    Timeout,

    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON-RPC error: {0}")]
    JsonRpc(#[from] JsonRpcError),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
