//! Client configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use seaward_simulation::{SoundConfig, SyncConfig};

/// Address of a game server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,

    /// Use `wss://` instead of `ws://`
    #[serde(default)]
    pub secure: bool,

    /// Request path, including the leading slash
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            secure: false,
            path: default_path(),
        }
    }

    /// Same host and scheme on another port
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    /// WebSocket URL of the endpoint
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}{}", scheme, self.host, self.port, self.path)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("127.0.0.1", 8080)
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server to connect to when no matchmaker is configured
    pub endpoint: Endpoint,

    /// Matchmaker queried once per session for the endpoint
    pub matchmaker_url: Option<String>,

    /// Name used for `join-game`
    pub player_name: Option<String>,

    /// Send `join-game` as soon as the transport opens
    pub auto_login: bool,

    /// Delay between a transport close and the reconnect attempt
    pub reconnect_delay: Duration,

    /// Delay between applying the world and sending `init-loop`
    pub init_loop_delay: Duration,

    /// Render tick period used by [`crate::GameSession::run`]
    pub render_interval: Duration,

    /// Capacity of the transport and session channels
    pub channel_capacity: usize,

    pub sync: SyncConfig,
    pub sound: SoundConfig,
}

impl ClientConfig {
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the player name and enables auto-login
    pub fn with_player_name(mut self, name: impl Into<String>) -> Self {
        self.player_name = Some(name.into());
        self.auto_login = true;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::default(),
            matchmaker_url: None,
            player_name: None,
            auto_login: false,
            reconnect_delay: Duration::from_secs(2),
            init_loop_delay: Duration::from_millis(500),
            render_interval: Duration::from_millis(16),
            channel_capacity: 100,
            sync: SyncConfig::default(),
            sound: SoundConfig::default(),
        }
    }
}
