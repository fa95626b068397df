use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use seaward_protocol::{Envelope, Transport, TransportEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket client that connects to a server and bridges envelope channels
///
/// Envelopes travel as JSON text frames. Binary frames holding UTF-8 JSON
/// are accepted too. Frames that do not parse are dropped.
pub struct WebSocketClient {
    url: String,
}

impl WebSocketClient {
    /// Creates a new WebSocket client for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Transport for WebSocketClient {
    type Error = WebSocketClientError;

    async fn run(
        self,
        incoming_tx: mpsc::Sender<TransportEvent>,
        mut outgoing_rx: mpsc::Receiver<Envelope>,
    ) -> Result<(), Self::Error> {
        tracing::info!(url = %self.url, "Connecting to WebSocket server");

        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| WebSocketClientError::ConnectionError(e.to_string()))?;

        tracing::info!(url = %self.url, "WebSocket connection established");

        if incoming_tx.send(TransportEvent::Opened).await.is_err() {
            return Err(WebSocketClientError::ChannelError(
                "session stopped listening".to_string(),
            ));
        }

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        loop {
            tokio::select! {
                msg = ws_receiver.next() => {
                    let parsed = match msg {
                        Some(Ok(Message::Text(text))) => Envelope::from_text(&text),
                        Some(Ok(Message::Binary(data))) => Envelope::from_bytes(&data),
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("Server closed connection");
                            break;
                        }
                        Some(Ok(_)) => {
                            // Ping/pong frames are answered by tungstenite
                            continue;
                        }
                        Some(Err(e)) => {
                            tracing::error!(error = %e, "WebSocket error");
                            return Err(WebSocketClientError::WebSocketError(e.to_string()));
                        }
                        None => {
                            tracing::info!("Connection closed");
                            break;
                        }
                    };

                    match parsed {
                        Ok(envelope) => {
                            if let Err(e) = incoming_tx.send(TransportEvent::Message(envelope)).await {
                                tracing::error!(error = %e, "Failed to send envelope to session");
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping malformed message");
                        }
                    }
                }

                Some(envelope) = outgoing_rx.recv() => {
                    if let Err(e) = ws_sender.send(Message::Text(envelope.to_text())).await {
                        tracing::error!(error = %e, "Failed to send message");
                        return Err(WebSocketClientError::WebSocketError(e.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}

/// WebSocket client errors
#[derive(Debug, thiserror::Error)]
pub enum WebSocketClientError {
    #[error("Failed to connect: {0}")]
    ConnectionError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}
