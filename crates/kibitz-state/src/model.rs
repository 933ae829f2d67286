//! The values callers read out of the shared state.
//!
//! These are plain owned snapshots: every accessor hands out copies, so a
//! caller can hold on to them while the dispatcher keeps mutating the
//! tables underneath.

use kibitz_protocol::{ArchiveEntry, ChannelId, GameEntry, Score};
use serde::Serialize;

/// Rank label shown for comment authors without a rank.
pub const NO_RANK: &str = "NO_RANK";

/// One game in active play.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSummary {
    /// The game's channel id.
    pub id: ChannelId,
    pub black: String,
    pub white: String,
    pub move_count: u32,
    /// [`Score::UNFINISHED`] until the server reports a result.
    pub result: Score,
}

impl GameSummary {
    /// Builds a summary from a roster entry.
    ///
    /// Returns `None` when either seat is empty, which the server only
    /// does for game kinds that are not tracked here.
    pub fn from_entry(entry: &GameEntry) -> Option<Self> {
        let (black, white) = entry.players.names()?;
        Some(Self {
            id: entry.channel_id,
            black: black.to_owned(),
            white: white.to_owned(),
            move_count: entry.move_num,
            result: entry.score.unwrap_or(Score::UNFINISHED),
        })
    }
}

/// A finished game from a player's archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveGame {
    pub timestamp: String,
    pub black: String,
    pub white: String,
    pub result: Score,
}

impl ArchiveGame {
    pub fn from_entry(entry: &ArchiveEntry) -> Option<Self> {
        let (black, white) = entry.players.names()?;
        Some(Self {
            timestamp: entry.timestamp.clone(),
            black: black.to_owned(),
            white: white.to_owned(),
            result: entry.score.unwrap_or(Score::UNFINISHED),
        })
    }
}

/// The single archive slot: whose archive it holds, and the games.
///
/// `requested_user` is `None` between a new request and the server's
/// confirmation, so a stale list is never mistaken for a fresh one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveResult {
    pub requested_user: Option<String>,
    pub games: Vec<ArchiveGame>,
}

/// One line of kibitz chat in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEntry {
    pub channel_id: ChannelId,
    pub author: String,
    /// `None` when the author line carried no `[rank]`.
    pub rank: Option<String>,
    pub text: String,
}

impl CommentEntry {
    /// The rank, or [`NO_RANK`].
    pub fn rank_label(&self) -> &str {
        self.rank.as_deref().unwrap_or(NO_RANK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_protocol::{GameType, Players, ResultCode, User};

    fn entry(score: Option<Score>) -> GameEntry {
        GameEntry {
            channel_id: ChannelId(5),
            game_type: GameType::Free,
            players: Players::new(User::named("alice"), User::named("bob")),
            move_num: 12,
            score,
        }
    }

    #[test]
    fn test_summary_defaults_result_to_unfinished() {
        let summary = GameSummary::from_entry(&entry(None)).unwrap();
        assert_eq!(summary.result, Score::Code(ResultCode::Unfinished));
        assert_eq!(summary.move_count, 12);
        assert_eq!(summary.black, "alice");
        assert_eq!(summary.white, "bob");
    }

    #[test]
    fn test_summary_keeps_reported_score() {
        let summary =
            GameSummary::from_entry(&entry(Some(Score::Margin(-2.5)))).unwrap();
        assert_eq!(summary.result, Score::Margin(-2.5));
    }

    #[test]
    fn test_summary_requires_both_seats() {
        let mut e = entry(None);
        e.players.white = None;
        assert_eq!(GameSummary::from_entry(&e), None);
    }

    #[test]
    fn test_rank_label_falls_back_to_no_rank() {
        let comment = CommentEntry {
            channel_id: ChannelId(1),
            author: "bob".into(),
            rank: None,
            text: "hi".into(),
        };
        assert_eq!(comment.rank_label(), "NO_RANK");
    }
}
