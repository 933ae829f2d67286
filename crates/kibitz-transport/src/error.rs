use std::time::Duration;

use kibitz_protocol::ProtocolError;

/// Errors from `poll`, `send`, and `logout`.
///
/// The session loop treats every one of these as fatal: it stops rather
/// than retrying, and whoever owns the session decides whether to start
/// a new one.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server answered, but not with success.
    #[error("{operation} rejected with HTTP status {status}")]
    Status {
        operation: &'static str,
        status: u16,
    },

    /// No answer within the allowed time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Fetching events failed below HTTP (connection refused, reset, …).
    #[error("poll failed: {0}")]
    PollFailed(#[source] std::io::Error),

    /// Delivering a request failed below HTTP.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The body could not be encoded or was not a poll response at all.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Errors from `login`. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The server refused the credentials.
    #[error("login rejected with HTTP status {0}")]
    Rejected(u16),

    /// The server could not be reached.
    #[error("login request failed: {0}")]
    Unreachable(#[source] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
