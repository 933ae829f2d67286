//! Error types for the protocol layer.
//!
//! Each crate in Kibitz defines its own error enum. When you see a
//! `ProtocolError`, you know the problem is in turning KGS JSON into
//! Rust values (or back), not in networking or in the state model.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a known `type` tag whose body is
    /// missing required fields, or a truncated response.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// One message inside a poll response carried a known `type` tag but
    /// its body did not match the expected shape.
    #[cfg(feature = "json")]
    #[error("malformed {tag} message: {source}")]
    MalformedMessage {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    /// The message is well-formed JSON but not a KGS message at all,
    /// e.g. an object without a `type` field.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
