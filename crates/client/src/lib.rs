//! # Seaward Client
//!
//! Client engine for the seaward game: transports, the transport session,
//! the outgoing message router and the game session that ties them to the
//! world mirror.
//!
//! ## Example
//!
//! ```no_run
//! use seaward_client::{Client, ClientConfig, Endpoint, GameSession};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig::default()
//!         .with_endpoint(Endpoint::new("127.0.0.1", 8080))
//!         .with_player_name("Ann");
//!
//!     let mut client = Client::new();
//!     client.switch_to(GameSession::multiplayer(config)).await.unwrap();
//!
//!     if let Some(session) = client.session_mut() {
//!         session.run().await;
//!     }
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod game;
pub mod router;
pub mod session;
pub mod transport;

pub use config::{ClientConfig, Endpoint};
pub use discovery::{Discovery, MatchmakerDiscovery, StaticDiscovery};
pub use error::{ClientError, DiscoveryError};
pub use game::{GameMode, GameSession, SessionStatus, SpawnMenus, TickReport};
pub use router::{OutgoingRouter, RouteMode, Routed};
pub use session::{SessionEvent, TimerKind, TransportSession};
pub use transport::{Connector, MemoryConnector, TransportError, WebSocketConnector};

/// Holds the active game session and swaps it on mode change
///
/// Switching shuts the previous session down first, so none of its timers
/// or connections can touch the new one.
#[derive(Debug, Default)]
pub struct Client {
    session: Option<GameSession>,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shuts down the current session and starts `next`
    ///
    /// A failed start (e.g. discovery) still installs `next` so the UI can
    /// read its status.
    pub async fn switch_to(&mut self, mut next: GameSession) -> Result<(), ClientError> {
        if let Some(mut previous) = self.session.take() {
            tracing::info!(from = ?previous.mode(), to = ?next.mode(), "Switching game mode");
            previous.shutdown();
        }

        let result = next.start().await;
        self.session = Some(next);
        result
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut GameSession> {
        self.session.as_mut()
    }

    /// Shuts down and drops the current session
    pub fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.shutdown();
        }
    }
}
