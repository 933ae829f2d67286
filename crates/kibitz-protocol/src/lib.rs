//! Wire protocol for Kibitz.
//!
//! This crate defines the "language" the KGS JSON API speaks:
//!
//! - **Types** ([`Event`], [`Request`], [`GameEntry`], [`Score`], etc.):
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits below the transport. It doesn't know about
//! HTTP, cookies, or the state model, only how KGS messages look.
//!
//! ```text
//! Transport (HTTP bodies) → Protocol (Event / Request) → State (games, comments)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ArchiveEntry, ChannelId, Event, GameEntry, GameType, GlobalList, Players,
    Prop, Request, ResultCode, Score, SgfEvent, User,
};
