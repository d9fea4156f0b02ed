//! Adapts the websocket client to the core's channel seam.

use async_trait::async_trait;
use coach_core::channel::HintChannel;
use hint_channel::client::{ChannelError, ConnectionState, HintClient};
use hint_channel::protocol::OutboundMessage;

/// [`HintChannel`] over the concrete websocket client. The runtime owns the
/// connect step and hands the connected client in here; the orchestrator
/// never sees anything below this seam.
pub struct SocketChannel {
    client: HintClient,
}

impl SocketChannel {
    pub fn new(client: HintClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HintChannel for SocketChannel {
    fn is_open(&self) -> bool {
        self.client.state() == ConnectionState::Open
    }

    async fn dispatch(&self, message: OutboundMessage) -> Result<(), ChannelError> {
        self.client.send(&message).await
    }
}
