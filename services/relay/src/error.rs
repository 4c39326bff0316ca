//! Error taxonomy for the relay service
//!
//! Upstream transport and protocol failures are recovered locally by the
//! feed supervisor (reconnect with backoff); none of these are fatal to
//! the process.

use std::time::Duration;

use thiserror::Error;

/// Failures on one upstream feed connection.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("handshake timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("upstream closed the connection")]
    ConnectionClosed,

    #[error("update id gap: expected first id <= {expected}, got {actual}")]
    SequenceGap { expected: u64, actual: u64 },

    #[error("relay command channel closed")]
    ChannelClosed,
}
