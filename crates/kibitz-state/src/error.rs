//! Error types for the state layer.

use std::time::Duration;

/// A comment line that doesn't look like `author [rank]: text`.
///
/// The dispatcher logs and skips such lines; they never stop event
/// processing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommentParseError {
    /// No `:` between speaker and text.
    #[error("comment line has no author separator: {0:?}")]
    MissingSeparator(String),

    /// Nothing before the `:`.
    #[error("comment line has an empty author: {0:?}")]
    EmptyAuthor(String),

    /// The speaker part is not a single account name (a stray
    /// continuation line containing a colon, for instance).
    #[error("comment line has an invalid author {author:?}")]
    InvalidAuthor { author: String },

    /// A `[` without a closing `]` at the end of the speaker part.
    #[error("comment line has an unterminated rank marker: {0:?}")]
    UnterminatedRank(String),
}

/// Errors surfaced to a caller waiting for an archive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    /// The server says there is no account with this name.
    #[error("no archive exists for user {0}")]
    NoSuchUser(String),

    /// The caller-supplied wait bound elapsed first.
    #[error("archive for {user} not confirmed within {after:?}")]
    TimedOut { user: String, after: Duration },

    /// The session state was torn down while waiting.
    #[error("archive slot closed before the request was answered")]
    Closed,
}
