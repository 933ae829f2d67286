//! Unified error type for the Kibitz client.

use kibitz_protocol::ProtocolError;
use kibitz_session::{LoopStatus, SessionError};
use kibitz_state::ArchiveError;
use kibitz_transport::{AuthError, TransportError};

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attributes let `?` lift sub-crate errors into this one,
/// so callers of the `kibitz` crate only match on a single type.
#[derive(Debug, thiserror::Error)]
pub enum KibitzError {
    /// Login failed; nothing was started.
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session loop ended with an error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// No such user, or the caller's wait bound elapsed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The session loop is gone, so the request can't be delivered.
    #[error("request queue closed; the session loop has ended")]
    QueueClosed,

    /// The loop ended while a caller was waiting on an answer.
    #[error("session ended while waiting ({0})")]
    SessionEnded(LoopStatus),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_auth_error() {
        let err: KibitzError = AuthError::Rejected(401).into();
        assert!(matches!(err, KibitzError::Auth(_)));
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_from_session_error_keeps_transport_message() {
        let err: KibitzError = SessionError::from(TransportError::Status {
            operation: "poll",
            status: 502,
        })
        .into();
        assert!(matches!(err, KibitzError::Session(_)));
        assert_eq!(err.to_string(), "poll rejected with HTTP status 502");
    }

    #[test]
    fn test_from_archive_error() {
        let err: KibitzError = ArchiveError::NoSuchUser("ghost".into()).into();
        assert!(matches!(err, KibitzError::Archive(ArchiveError::NoSuchUser(_))));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: KibitzError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, KibitzError::Protocol(_)));
    }

    #[test]
    fn test_session_ended_shows_status() {
        let err = KibitzError::SessionEnded(LoopStatus::Failed("boom".into()));
        assert_eq!(err.to_string(), "session ended while waiting (failed: boom)");
    }
}
