//! Kibitz chat: parsing `COMMENT` properties and the drain-on-read log.
//!
//! KGS stores in-game chat as the `COMMENT` property of record nodes. Each
//! line of that text is one remark:
//!
//! ```text
//! alice [4d]: hello
//! bob: hi there
//! ```
//!
//! The `[rank]` part is missing for unranked accounts.

use std::sync::Mutex;

use kibitz_protocol::ChannelId;

use crate::{CommentEntry, CommentParseError, lock};

/// Parses one non-blank comment line.
pub fn parse_comment_line(
    channel_id: ChannelId,
    line: &str,
) -> Result<CommentEntry, CommentParseError> {
    let (speaker, text) = line
        .split_once(':')
        .ok_or_else(|| CommentParseError::MissingSeparator(line.to_owned()))?;
    let speaker = speaker.trim();
    if speaker.is_empty() {
        return Err(CommentParseError::EmptyAuthor(line.to_owned()));
    }

    let (author, rank) = match speaker.find('[') {
        Some(open) => {
            let inner = speaker[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| {
                    CommentParseError::UnterminatedRank(line.to_owned())
                })?
                .trim();
            let rank = (!inner.is_empty()).then(|| inner.to_owned());
            (speaker[..open].trim_end(), rank)
        }
        None => (speaker, None),
    };

    if author.is_empty() {
        return Err(CommentParseError::EmptyAuthor(line.to_owned()));
    }
    if author.contains(char::is_whitespace) {
        return Err(CommentParseError::InvalidAuthor {
            author: author.to_owned(),
        });
    }

    Ok(CommentEntry {
        channel_id,
        author: author.to_owned(),
        rank,
        text: text.strip_prefix(' ').unwrap_or(text).to_owned(),
    })
}

/// Parses a whole `COMMENT` text into entries, in line order.
///
/// Blank lines are skipped. Malformed lines are logged and skipped; the
/// lines around them still come through.
pub fn parse_comments(channel_id: ChannelId, text: &str) -> Vec<CommentEntry> {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match parse_comment_line(channel_id, line) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(%channel_id, error = %e, "skipping comment line");
                None
            }
        })
        .collect()
}

/// Comments accumulated since the last drain, in arrival order.
#[derive(Debug, Default)]
pub struct CommentLog {
    entries: Mutex<Vec<CommentEntry>>,
}

impl CommentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends entries after everything already logged.
    pub fn append(&self, entries: Vec<CommentEntry>) {
        if entries.is_empty() {
            return;
        }
        lock(&self.entries).extend(entries);
    }

    /// Moves every logged comment out, leaving the log empty.
    pub fn drain(&self) -> Vec<CommentEntry> {
        std::mem::take(&mut *lock(&self.entries))
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
