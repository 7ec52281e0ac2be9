//! The transport seam between the bridge and whatever carries its messages.

use async_trait::async_trait;

use crate::protocol::OutboundMessage;

/// Returned by a [`MediaSink`] when a message could not be delivered.
///
/// The bridge treats every sink failure as terminal for that message and
/// non-terminal for the session, so this intentionally carries nothing more
/// than a description for the log line.
#[derive(Debug, thiserror::Error)]
#[error("transport send failed: {reason}")]
pub struct SinkError {
    reason: String,
}

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Write side of the media-stream transport.
///
/// The gateway implements this over the WebSocket sink; tests record sent
/// messages instead. Sends may suspend on transport backpressure.
#[async_trait]
pub trait MediaSink: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError>;
}
