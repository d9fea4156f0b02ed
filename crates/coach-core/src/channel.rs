//! Seam between orchestration logic and the hint-service connection.

use async_trait::async_trait;
use hint_channel::client::ChannelError;
use hint_channel::protocol::OutboundMessage;
#[cfg(test)]
use mockall::automock;

/// The orchestrator's view of the connection to the hint service.
///
/// The concrete websocket client lives in the `hint-channel` crate; the
/// runtime injects it behind this trait so the dispatch policy can be
/// exercised against a mock.
#[async_trait]
#[cfg_attr(test, automock)]
pub trait HintChannel: Send + Sync {
    /// Whether the connection is open right now. Silence dispatches are
    /// gated on this, so a quiet candidate never drains the transcript into
    /// a dead socket.
    fn is_open(&self) -> bool;

    /// Sends one frame. Fire-and-forget beyond delivery to the socket
    /// writer; fails fast when the connection is not open.
    async fn dispatch(&self, message: OutboundMessage) -> Result<(), ChannelError>;
}
