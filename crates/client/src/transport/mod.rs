//! Client transports
//!
//! A [`Transport`] owns one physical connection and is consumed by
//! [`Transport::run`]. Sessions reconnect, so they hold a [`Connector`] that
//! builds a fresh transport for every attempt.

pub mod memory;
pub mod websocket;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use seaward_protocol::{Envelope, Transport, TransportEvent};
use tokio::sync::mpsc;

use crate::config::Endpoint;

pub use memory::MemoryTransport;
pub use websocket::WebSocketClient;

/// Connection failures reported by a [`Connector`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Connection failed: {0}")]
    Failed(String),
}

/// Opens connections for a transport session
pub trait Connector: Send + Sync + 'static {
    /// Returns a future that runs one connection to `endpoint` until it
    /// closes
    fn open(
        &self,
        endpoint: &Endpoint,
        incoming_tx: mpsc::Sender<TransportEvent>,
        outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> BoxFuture<'static, Result<(), TransportError>>;
}

/// Connects over WebSocket
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(
        &self,
        endpoint: &Endpoint,
        incoming_tx: mpsc::Sender<TransportEvent>,
        outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let client = WebSocketClient::new(endpoint.url());
        async move {
            client
                .run(incoming_tx, outgoing_rx)
                .await
                .map_err(|e| match e {
                    websocket::WebSocketClientError::ConnectionError(reason) => {
                        TransportError::Connect(reason)
                    }
                    other => TransportError::Failed(other.to_string()),
                })
        }
        .boxed()
    }
}

/// Hands out queued in-memory transports, one per connection attempt
///
/// An attempt with nothing queued fails like an unreachable server.
///
/// # Example
///
/// ```
/// use seaward_client::transport::MemoryConnector;
///
/// let connector = MemoryConnector::new();
/// let server_side = connector.accept_next(16);
/// assert_eq!(connector.queued(), 1);
/// # drop(server_side);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    queued: Arc<Mutex<VecDeque<MemoryTransport>>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the client side of a connection
    pub fn push(&self, transport: MemoryTransport) {
        self.lock().push_back(transport);
    }

    /// Queues a new connection and returns its server side
    pub fn accept_next(&self, buffer_size: usize) -> MemoryTransport {
        let (client, server) = MemoryTransport::create_pair(buffer_size);
        self.push(client);
        server
    }

    /// Number of connections not yet taken by a session
    pub fn queued(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<MemoryTransport>> {
        self.queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Connector for MemoryConnector {
    fn open(
        &self,
        _endpoint: &Endpoint,
        incoming_tx: mpsc::Sender<TransportEvent>,
        outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let next = self.lock().pop_front();
        async move {
            match next {
                Some(transport) => transport
                    .run(incoming_tx, outgoing_rx)
                    .await
                    .map_err(|e| TransportError::Failed(e.to_string())),
                None => Err(TransportError::Connect("no peer is listening".to_string())),
            }
        }
        .boxed()
    }
}
