//! Error types for the session layer.

use kibitz_transport::TransportError;

/// Why the session loop ended abnormally.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `poll` or `send` failed, or `poll` exceeded its bound.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Nobody is consuming events any more.
    #[error("inbound event queue closed")]
    InboundClosed,

    /// The loop task panicked or was aborted.
    #[error("session loop task ended abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),
}
