//! In-memory transport for tests and in-process servers
//!
//! This transport uses Tokio channels instead of network sockets. The two
//! halves of a pair exchange envelopes directly; dropping one half closes
//! the connection for the other.

use async_trait::async_trait;
use seaward_protocol::{Envelope, Transport, TransportEvent};
use tokio::sync::mpsc;

/// In-memory transport that communicates via channels
///
/// # Example
///
/// ```
/// use seaward_client::transport::memory::MemoryTransport;
///
/// let (client_transport, server_transport) = MemoryTransport::create_pair(100);
/// let (to_client, from_client) = server_transport.into_parts();
/// # drop((client_transport, to_client, from_client));
/// ```
#[derive(Debug)]
pub struct MemoryTransport {
    /// Channel to send envelopes to the peer
    to_peer: mpsc::Sender<Envelope>,
    /// Channel to receive envelopes from the peer
    from_peer: mpsc::Receiver<Envelope>,
}

impl MemoryTransport {
    pub fn new(to_peer: mpsc::Sender<Envelope>, from_peer: mpsc::Receiver<Envelope>) -> Self {
        Self { to_peer, from_peer }
    }

    /// Creates a pair of connected transports
    ///
    /// # Returns
    /// A tuple of (client_transport, server_transport)
    pub fn create_pair(buffer_size: usize) -> (Self, Self) {
        let (client_to_server_tx, client_to_server_rx) = mpsc::channel(buffer_size);
        let (server_to_client_tx, server_to_client_rx) = mpsc::channel(buffer_size);

        let client_transport = Self::new(client_to_server_tx, server_to_client_rx);
        let server_transport = Self::new(server_to_client_tx, client_to_server_rx);

        (client_transport, server_transport)
    }

    /// Raw channels, for peers that drive the connection by hand
    pub fn into_parts(self) -> (mpsc::Sender<Envelope>, mpsc::Receiver<Envelope>) {
        (self.to_peer, self.from_peer)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    type Error = MemoryTransportError;

    async fn run(
        mut self,
        incoming_tx: mpsc::Sender<TransportEvent>,
        mut outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> Result<(), Self::Error> {
        if incoming_tx.send(TransportEvent::Opened).await.is_err() {
            return Err(MemoryTransportError::ChannelClosed);
        }

        loop {
            tokio::select! {
                // Receive from peer, forward to session
                envelope = self.from_peer.recv() => {
                    let Some(envelope) = envelope else {
                        tracing::debug!("Memory peer closed the connection");
                        return Ok(());
                    };
                    if incoming_tx.send(TransportEvent::Message(envelope)).await.is_err() {
                        return Err(MemoryTransportError::ChannelClosed);
                    }
                }

                // Receive from session, send to peer
                Some(envelope) = outgoing_rx.recv() => {
                    if self.to_peer.send(envelope).await.is_err() {
                        return Err(MemoryTransportError::ChannelClosed);
                    }
                }
            }
        }
    }
}

/// Memory transport errors
#[derive(Debug, thiserror::Error)]
pub enum MemoryTransportError {
    #[error("Transport channel closed")]
    ChannelClosed,
}
