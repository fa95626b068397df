use seaward_protocol::ProtocolError;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Transport is not connected")]
    NotConnected,

    #[error("Failed to send envelope through channel")]
    ChannelSendError,

    #[error("Session has no transport")]
    NoTransport,
}

/// Matchmaking errors
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Matchmaker request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Matchmaker returned status {0}")]
    Status(u16),

    #[error("Invalid matchmaker response: {0}")]
    InvalidResponse(String),
}
