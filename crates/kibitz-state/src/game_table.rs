//! The game table: every game currently in active play.

use std::collections::HashMap;
use std::sync::Mutex;

use kibitz_protocol::{ChannelId, GameEntry};

use crate::{GameSummary, lock};

/// What a roster event did to the table, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterChange {
    pub upserted: usize,
    pub removed: usize,
}

/// Games keyed by id, behind their own lock.
///
/// Holds exactly the games most recently listed as `free` or `ranked`
/// with both seats filled, and not since listed as `review` or removed. Entries are replaced whole,
/// never merged, so applying the same roster twice changes nothing.
#[derive(Debug, Default)]
pub struct GameTable {
    games: Mutex<HashMap<ChannelId, GameSummary>>,
}

impl GameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one roster: upserts active games, removes reviews and
    /// active games listed with an empty seat.
    ///
    /// Summaries are built before taking the lock, and the whole roster
    /// lands under a single acquisition, so readers see it all or none.
    pub fn apply_roster(&self, entries: &[GameEntry]) -> RosterChange {
        enum Op {
            Upsert(GameSummary),
            Remove(ChannelId),
        }

        let ops: Vec<Op> = entries
            .iter()
            .filter_map(|entry| {
                if entry.game_type.is_active_play() {
                    match GameSummary::from_entry(entry) {
                        Some(summary) => Some(Op::Upsert(summary)),
                        // A listing the table can't represent drops any
                        // summary it held for that id.
                        None => {
                            tracing::warn!(
                                id = %entry.channel_id,
                                "active game without both players, dropping"
                            );
                            Some(Op::Remove(entry.channel_id))
                        }
                    }
                } else if entry.game_type.is_review() {
                    Some(Op::Remove(entry.channel_id))
                } else {
                    None
                }
            })
            .collect();

        let mut change = RosterChange::default();
        let mut games = lock(&self.games);
        for op in ops {
            match op {
                Op::Upsert(summary) => {
                    games.insert(summary.id, summary);
                    change.upserted += 1;
                }
                Op::Remove(id) => {
                    if games.remove(&id).is_some() {
                        change.removed += 1;
                    }
                }
            }
        }
        change
    }

    /// Removes a game. Returns whether it was present; absent is fine.
    pub fn remove(&self, id: ChannelId) -> bool {
        lock(&self.games).remove(&id).is_some()
    }

    /// A copy of one game.
    pub fn get(&self, id: ChannelId) -> Option<GameSummary> {
        lock(&self.games).get(&id).cloned()
    }

    /// A point-in-time copy of every game, in no particular order.
    pub fn snapshot(&self) -> Vec<GameSummary> {
        lock(&self.games).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.games).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_protocol::{GameType, Players, Score, User};

    fn game(id: u64, game_type: GameType, move_num: u32) -> GameEntry {
        GameEntry {
            channel_id: ChannelId(id),
            game_type,
            players: Players::new(User::named("alice"), User::named("bob")),
            move_num,
            score: None,
        }
    }

    fn sorted(table: &GameTable) -> Vec<GameSummary> {
        let mut games = table.snapshot();
        games.sort_by_key(|g| g.id);
        games
    }

    #[test]
    fn test_roster_applied_twice_equals_once() {
        let roster = vec![
            game(1, GameType::Free, 10),
            game(2, GameType::Ranked, 20),
            game(3, GameType::Review, 0),
        ];

        let once = GameTable::new();
        once.apply_roster(&roster);

        let twice = GameTable::new();
        twice.apply_roster(&roster);
        twice.apply_roster(&roster);

        assert_eq!(sorted(&once), sorted(&twice));
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_free_game_without_score_is_unfinished() {
        let table = GameTable::new();
        table.apply_roster(&[game(1, GameType::Free, 3)]);
        assert_eq!(table.get(ChannelId(1)).unwrap().result, Score::UNFINISHED);
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let table = GameTable::new();
        table.apply_roster(&[game(1, GameType::Free, 3)]);

        let mut later = game(1, GameType::Free, 4);
        later.score = Some(Score::Margin(7.5));
        later.players.white = Some(User::named("carol"));
        table.apply_roster(&[later]);

        let summary = table.get(ChannelId(1)).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(summary.move_count, 4);
        assert_eq!(summary.white, "carol");
        assert_eq!(summary.result, Score::Margin(7.5));
    }

    #[test]
    fn test_game_turning_into_review_is_removed() {
        let table = GameTable::new();
        table.apply_roster(&[game(1, GameType::Ranked, 200)]);

        let change = table.apply_roster(&[game(1, GameType::Review, 200)]);

        assert_eq!(change, RosterChange { upserted: 0, removed: 1 });
        assert!(table.is_empty());
    }

    #[test]
    fn test_other_game_types_are_ignored() {
        let table = GameTable::new();
        let change = table.apply_roster(&[
            game(1, GameType::Other("teaching".into()), 5),
            game(2, GameType::Other("demonstration".into()), 0),
        ]);
        assert_eq!(change, RosterChange::default());
        assert!(table.is_empty());
    }

    #[test]
    fn test_active_game_with_empty_seat_is_skipped() {
        let table = GameTable::new();
        let mut half = game(1, GameType::Free, 0);
        half.players.black = None;

        table.apply_roster(&[half, game(2, GameType::Free, 0)]);

        assert_eq!(table.get(ChannelId(1)), None);
        assert!(table.get(ChannelId(2)).is_some());
    }

    #[test]
    fn test_tracked_game_relisted_with_empty_seat_is_dropped() {
        let table = GameTable::new();
        table.apply_roster(&[game(1, GameType::Ranked, 40)]);

        let mut later = game(1, GameType::Ranked, 41);
        later.players.white = None;
        let change = table.apply_roster(&[later]);

        assert_eq!(change, RosterChange { upserted: 0, removed: 1 });
        assert_eq!(table.get(ChannelId(1)), None);
    }

    #[test]
    fn test_remove_absent_id_is_a_no_op() {
        let table = GameTable::new();
        table.apply_roster(&[game(1, GameType::Free, 0)]);

        assert!(!table.remove(ChannelId(99)));
        assert!(table.remove(ChannelId(1)));
        assert!(!table.remove(ChannelId(1)));
        assert!(table.is_empty());
    }
}
