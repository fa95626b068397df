//! Transport layer abstraction
//!
//! A transport owns one physical connection. It reports when the connection
//! opens, forwards every decoded inbound envelope, writes outbound envelopes,
//! and returns from [`Transport::run`] when the connection closes.

use crate::Envelope;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events a transport reports to its session
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The connection is established and ready for traffic
    Opened,

    /// An envelope arrived
    Message(Envelope),
}

/// Transport layer abstraction for network communication
///
/// # Example: Implementing a custom transport
///
/// ```no_run
/// use async_trait::async_trait;
/// use seaward_protocol::transport::{Transport, TransportEvent};
/// use seaward_protocol::Envelope;
/// use tokio::sync::mpsc;
///
/// struct LoopbackTransport;
///
/// #[async_trait]
/// impl Transport for LoopbackTransport {
///     type Error = std::io::Error;
///
///     async fn run(
///         self,
///         incoming_tx: mpsc::Sender<TransportEvent>,
///         mut outgoing_rx: mpsc::Receiver<Envelope>,
///     ) -> Result<(), Self::Error> {
///         let _ = incoming_tx.send(TransportEvent::Opened).await;
///         while let Some(envelope) = outgoing_rx.recv().await {
///             let _ = incoming_tx.send(TransportEvent::Message(envelope)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + 'static {
    /// Error type for this transport
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the transport until the connection closes
    ///
    /// Implementations send [`TransportEvent::Opened`] once connected, then
    /// bridge envelopes between the network and the channels. Inbound data
    /// that does not parse as an envelope is dropped. Returns `Ok(())` on a
    /// clean close and an error if the connection could not be established
    /// or failed.
    async fn run(
        self,
        incoming_tx: mpsc::Sender<TransportEvent>,
        outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> Result<(), Self::Error>;
}
