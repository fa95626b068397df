//! Transport session lifecycle
//!
//! A [`TransportSession`] owns at most one live connection. Every connect or
//! manual close starts a new generation; events and timers carry the
//! generation they were created in, and the game session ignores those that
//! no longer match.

use std::time::Duration;

use seaward_protocol::{ClientMessage, ConnectionState, Envelope, TransportEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Endpoint;
use crate::error::ClientError;
use crate::transport::Connector;

/// Delayed operations a session can schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Reconnect,
    InitLoop,
}

/// Everything the game session reacts to, in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Opened {
        generation: u64,
    },
    Message {
        generation: u64,
        envelope: Envelope,
    },
    Closed {
        generation: u64,
        error: Option<String>,
    },
    Timer {
        generation: u64,
        kind: TimerKind,
    },
}

impl SessionEvent {
    pub fn generation(&self) -> u64 {
        match self {
            SessionEvent::Opened { generation }
            | SessionEvent::Message { generation, .. }
            | SessionEvent::Closed { generation, .. }
            | SessionEvent::Timer { generation, .. } => *generation,
        }
    }
}

pub struct TransportSession {
    connector: Box<dyn Connector>,
    endpoint: Endpoint,
    state: ConnectionState,
    generation: u64,
    channel_capacity: usize,

    /// Send-side of the live connection
    outgoing_tx: Option<mpsc::Sender<Envelope>>,
    task: Option<JoinHandle<()>>,
    timers: Vec<JoinHandle<()>>,

    events_tx: mpsc::Sender<SessionEvent>,

    /// Send `join-game` when the connection opens
    pub auto_login: bool,
}

impl TransportSession {
    pub fn new(
        connector: Box<dyn Connector>,
        endpoint: Endpoint,
        events_tx: mpsc::Sender<SessionEvent>,
        channel_capacity: usize,
    ) -> Self {
        Self {
            connector,
            endpoint,
            state: ConnectionState::Closed,
            generation: 0,
            channel_capacity,
            outgoing_tx: None,
            task: None,
            timers: Vec::new(),
            events_tx,
            auto_login: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    /// Whether an event or timer from `generation` still applies
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Moves the state machine, logging rejected transitions
    pub fn set_state(&mut self, next: ConnectionState) {
        if let Err(e) = self.state.transition_to(next) {
            tracing::warn!(error = %e, "Ignoring connection state change");
        }
    }

    /// Starts a new connection attempt, dropping any live connection
    pub fn connect(&mut self) {
        self.stop_connection();
        self.generation += 1;
        self.set_state(ConnectionState::Connecting);

        let generation = self.generation;
        let (incoming_tx, mut incoming_rx) = mpsc::channel(self.channel_capacity);
        let (outgoing_tx, outgoing_rx) = mpsc::channel(self.channel_capacity);
        self.outgoing_tx = Some(outgoing_tx);

        tracing::info!(
            endpoint = %self.endpoint.url(),
            generation,
            "Connecting"
        );

        let connection = self.connector.open(&self.endpoint, incoming_tx, outgoing_rx);
        let events_tx = self.events_tx.clone();

        self.task = Some(tokio::spawn(async move {
            let forward = async {
                while let Some(event) = incoming_rx.recv().await {
                    let event = match event {
                        TransportEvent::Opened => SessionEvent::Opened { generation },
                        TransportEvent::Message(envelope) => SessionEvent::Message {
                            generation,
                            envelope,
                        },
                    };
                    if events_tx.send(event).await.is_err() {
                        break;
                    }
                }
            };

            // The connection future owns the incoming sender, so the
            // forwarder drains every message before the close is reported
            let (result, ()) = tokio::join!(connection, forward);
            let error = result.err().map(|e| e.to_string());
            let _ = events_tx.send(SessionEvent::Closed { generation, error }).await;
        }));
    }

    /// Sender for the live connection, if any
    pub fn link(&self) -> Option<mpsc::Sender<Envelope>> {
        self.outgoing_tx.clone()
    }

    /// Sends a message on the live connection
    pub fn send(&self, message: &ClientMessage) -> Result<(), ClientError> {
        let outgoing_tx = self.outgoing_tx.as_ref().ok_or(ClientError::NotConnected)?;
        let envelope = message.to_envelope()?;

        tracing::trace!(event = %envelope.event, "Sending");
        outgoing_tx
            .try_send(envelope)
            .map_err(|_| ClientError::ChannelSendError)
    }

    /// Fires a [`SessionEvent::Timer`] for the current generation after
    /// `delay`
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration) {
        let generation = self.generation;
        let events_tx = self.events_tx.clone();

        self.timers.retain(|timer| !timer.is_finished());
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events_tx.send(SessionEvent::Timer { generation, kind }).await;
        }));

        tracing::debug!(?kind, delay_ms = delay.as_millis() as u64, generation, "Scheduled timer");
    }

    /// Records that the connection of the current generation ended
    pub fn handle_closed(&mut self) {
        self.outgoing_tx = None;
        self.task = None;
        self.set_state(ConnectionState::Closed);
    }

    /// Closes the connection and cancels every timer
    ///
    /// Starts a new generation so late events from the old connection are
    /// ignored.
    pub fn close(&mut self) {
        self.stop_connection();
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        self.generation += 1;
        self.set_state(ConnectionState::Closed);

        tracing::info!(generation = self.generation, "Transport session closed");
    }

    fn stop_connection(&mut self) {
        self.outgoing_tx = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        self.stop_connection();
        for timer in self.timers.drain(..) {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryConnector;

    fn session(connector: &MemoryConnector) -> (TransportSession, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(32);
        let session = TransportSession::new(
            Box::new(connector.clone()),
            Endpoint::default(),
            events_tx,
            16,
        );
        (session, events_rx)
    }

    async fn next(rx: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_reports_open_with_generation() {
        let connector = MemoryConnector::new();
        let _server = connector.accept_next(8);
        let (mut session, mut events) = session(&connector);

        session.connect();

        assert_eq!(session.state(), ConnectionState::Connecting);
        assert_eq!(next(&mut events).await, SessionEvent::Opened { generation: 1 });
    }

    #[tokio::test]
    async fn test_failed_connect_reports_close() {
        let connector = MemoryConnector::new();
        let (mut session, mut events) = session(&connector);

        session.connect();

        match next(&mut events).await {
            SessionEvent::Closed { generation, error } => {
                assert_eq!(generation, 1);
                assert!(error.is_some());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_messages_arrive_before_close() {
        let connector = MemoryConnector::new();
        let server = connector.accept_next(8);
        let (mut session, mut events) = session(&connector);
        session.connect();

        let (to_client, from_client) = server.into_parts();
        to_client.send(Envelope::empty("send-world")).await.unwrap();
        drop((to_client, from_client));

        assert!(matches!(next(&mut events).await, SessionEvent::Opened { .. }));
        assert!(matches!(next(&mut events).await, SessionEvent::Message { .. }));
        assert!(matches!(next(&mut events).await, SessionEvent::Closed { error: None, .. }));
    }

    #[tokio::test]
    async fn test_send_requires_connection() {
        let connector = MemoryConnector::new();
        let (session, _events) = session(&connector);

        assert!(matches!(
            session.send(&ClientMessage::Ack),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_close_cancels_timers() {
        let connector = MemoryConnector::new();
        let (mut session, mut events) = session(&connector);

        session.schedule(TimerKind::Reconnect, Duration::from_millis(20));
        session.close();

        let late = tokio::time::timeout(Duration::from_millis(100), events.recv()).await;
        assert!(late.is_err());
        assert_eq!(session.generation(), 1);
    }

    #[tokio::test]
    async fn test_timer_carries_generation() {
        let connector = MemoryConnector::new();
        let (mut session, mut events) = session(&connector);

        session.schedule(TimerKind::InitLoop, Duration::from_millis(10));
        let event = next(&mut events).await;

        assert_eq!(
            event,
            SessionEvent::Timer {
                generation: 0,
                kind: TimerKind::InitLoop
            }
        );
        assert!(session.is_current(event.generation()));
    }
}
