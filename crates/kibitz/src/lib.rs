//! # Kibitz
//!
//! Session client for the KGS Go server's JSON long-poll API.
//!
//! A [`KibitzClient`] logs in, then two background tasks keep it current:
//! the session loop polls the server and flushes queued requests, and the
//! dispatcher folds incoming events into in-memory state. Callers read
//! that state whenever they like:
//!
//! - [`KibitzClient::list_active_games`] for games in play
//! - [`KibitzClient::request_archive`] for one player's finished games
//! - [`KibitzClient::drain_comments`] for kibitz chat from joined games
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kibitz::prelude::*;
//!
//! # async fn demo() -> Result<(), KibitzError> {
//! let client = KibitzClient::builder(Credentials::new("watcher", "secret"))
//!     .connect_http()
//!     .await?;
//!
//! let games = client.list_active_games();
//! if let Some(game) = games.first() {
//!     client.enqueue_join_channel(game.id)?;
//! }
//! let archive = client.request_archive("someone").await?;
//! println!("{} archived games", archive.len());
//!
//! client.shutdown().await
//! # }
//! ```

mod client;
mod error;

pub use client::{KibitzClient, KibitzClientBuilder};
pub use error::KibitzError;

pub use kibitz_protocol as protocol;
pub use kibitz_session as session;
pub use kibitz_state as state;
pub use kibitz_transport as transport;

pub mod prelude {
    pub use crate::{KibitzClient, KibitzClientBuilder, KibitzError};
    pub use kibitz_protocol::{ChannelId, ResultCode, Score};
    pub use kibitz_session::{LoopStatus, SessionConfig};
    pub use kibitz_state::{
        ArchiveError, ArchiveGame, ArchiveResult, CommentEntry, GameSummary,
    };
    pub use kibitz_transport::{Credentials, Transport};

    #[cfg(feature = "http")]
    pub use kibitz_transport::{HttpConfig, HttpTransport};
}
