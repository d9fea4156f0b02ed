//! Websocket channel to the remote coaching assistant.
//!
//! [`protocol`] defines the frames both directions speak; [`client`] drives
//! one connection, fans inbound frames out over a broadcast channel and
//! queues outbound frames behind the socket writer.

pub mod client;
pub mod protocol;

pub use client::{ChannelConfig, ChannelError, ChannelEvent, ConnectionState, HintClient};

/// Connects a client with the given configuration and returns it once the
/// websocket handshake has completed.
pub async fn connect(config: ChannelConfig) -> Result<HintClient, ChannelError> {
    let mut client = HintClient::new(config);
    client.connect().await?;
    Ok(client)
}
