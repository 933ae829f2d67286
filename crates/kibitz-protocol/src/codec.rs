//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The transport doesn't care HOW requests and poll bodies are encoded;
//! it just needs something that implements the [`Codec`] trait.
//!
//! KGS only speaks JSON, so [`JsonCodec`] is the one implementation. It
//! also knows how to split a long-poll response into individual
//! [`Event`]s without letting one malformed message spoil the batch.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{Event, ProtocolError};

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → safe to share between threads (the session loop
///   runs on whatever worker thread Tokio picks).
/// - `'static` → the codec owns everything it needs, so it can live
///   inside a transport stored in a long-lived task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use kibitz_protocol::{Codec, JsonCodec, Request, ChannelId};
///
/// let codec = JsonCodec;
/// let bytes = codec
///     .encode(&Request::JoinRequest { channel_id: ChannelId(42) })
///     .unwrap();
/// assert_eq!(bytes, br#"{"type":"JOIN_REQUEST","channelId":42}"#);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

/// The body of a long-poll `GET`: `{"messages": [...]}`.
///
/// KGS omits `messages` entirely when nothing happened before the poll
/// returned, so the field defaults to empty.
#[cfg(feature = "json")]
#[derive(Debug, Default, Deserialize)]
struct PollBody {
    #[serde(default)]
    messages: Vec<serde_json::Value>,
}

#[cfg(feature = "json")]
impl JsonCodec {
    /// Splits a poll response body into events, preserving server order.
    ///
    /// The outer `Result` fails only when the body itself is not a poll
    /// response. Each inner `Result` is one message: a known tag with a
    /// body that doesn't fit comes back as
    /// [`ProtocolError::MalformedMessage`] so the caller can log and skip
    /// it. Unknown tags are not errors; they decode to [`Event::Unknown`].
    pub fn decode_messages(
        &self,
        body: &[u8],
    ) -> Result<Vec<Result<Event, ProtocolError>>, ProtocolError> {
        // An empty body is how some proxies report "no news".
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let poll: PollBody = self.decode(body)?;
        Ok(poll.messages.into_iter().map(decode_message).collect())
    }
}

#[cfg(feature = "json")]
fn decode_message(value: serde_json::Value) -> Result<Event, ProtocolError> {
    let tag = match value.get("type").and_then(serde_json::Value::as_str) {
        Some(tag) => tag.to_owned(),
        None => {
            return Err(ProtocolError::InvalidMessage(
                "message without a type tag".into(),
            ));
        }
    };
    serde_json::from_value(value)
        .map_err(|source| ProtocolError::MalformedMessage { tag, source })
}
