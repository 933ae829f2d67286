//! Shared session state for Kibitz.
//!
//! Holds the derived views of the server that callers query (active
//! games, the requested archive, kibitz comments) and the dispatcher
//! task that keeps them current.
//!
//! # Key types
//!
//! - [`SharedState`]: the three independently locked slices
//! - [`GameTable`]: active games keyed by channel id
//! - [`ArchiveSlot`]: single-slot archive plus keyed waiters
//! - [`CommentLog`]: drain-on-read comment buffer
//! - [`Dispatcher`]: single consumer of the inbound event queue
//!
//! # Locking
//!
//! Slices use `std::sync::Mutex`: critical sections are short copies with
//! no `.await` inside, and callers may read from plain threads outside
//! the runtime.

mod archive;
mod comments;
mod dispatcher;
mod error;
mod game_table;
mod model;
mod shared;

pub use archive::{ArchiveReply, ArchiveSlot, ArchiveWaiter};
pub use comments::{CommentLog, parse_comment_line, parse_comments};
pub use dispatcher::{
    Dispatcher, DispatcherHandle, InboundReceiver, InboundSender,
    inbound_queue, spawn_dispatcher,
};
pub use error::{ArchiveError, CommentParseError};
pub use game_table::{GameTable, RosterChange};
pub use model::{
    ArchiveGame, ArchiveResult, CommentEntry, GameSummary, NO_RANK,
};
pub use shared::SharedState;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a slice. A panic while holding one of these locks can't leave
/// a half-written value behind (every write is a single insert, remove,
/// or swap), so poisoning is ignored.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
