//! The three state slices and how events mutate them.

use kibitz_protocol::Event;

use crate::comments::parse_comments;
use crate::{ArchiveGame, ArchiveSlot, CommentLog, GameTable};

/// Everything the dispatcher writes and callers read.
///
/// Each slice has its own lock, so a comment append never waits on a
/// caller copying the game table, and vice versa. Only the dispatcher
/// calls [`SharedState::apply`]; callers go through the slices' read and
/// drain methods.
#[derive(Debug, Default)]
pub struct SharedState {
    pub games: GameTable,
    pub archive: ArchiveSlot,
    pub comments: CommentLog,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one event.
    ///
    /// The handlers are independent checks, not branches of one match: an
    /// event that carries several kinds of payload feeds every slice it
    /// concerns.
    pub fn apply(&self, event: &Event) {
        let mut handled = false;

        if let Some(entries) = event.roster() {
            let change = self.games.apply_roster(entries);
            tracing::debug!(
                tag = event.tag(),
                upserted = change.upserted,
                removed = change.removed,
                "roster applied"
            );
            handled = true;
        }

        if let Some(id) = event.removed_game() {
            let was_present = self.games.remove(id);
            tracing::debug!(%id, was_present, "game removed");
            handled = true;
        }

        if let Some((user, entries)) = event.archive_join() {
            let games: Vec<ArchiveGame> = entries
                .iter()
                .filter(|e| e.game_type.is_active_play())
                .filter_map(ArchiveGame::from_entry)
                .collect();
            let count = games.len();
            let woken = self.archive.complete(&user.name, games);
            tracing::debug!(user = %user.name, games = count, woken, "archive joined");
            handled = true;
        }

        if let Event::ArchiveNonexistant { name } = event {
            let woken = self.archive.reject(name);
            tracing::debug!(user = %name, woken, "archive does not exist");
            handled = true;
        }

        if let Some((channel_id, sgf_events)) = event.record_events() {
            for sgf in sgf_events {
                for text in sgf.comments() {
                    self.comments.append(parse_comments(channel_id, text));
                }
            }
            handled = true;
        }

        if !handled {
            tracing::trace!(tag = event.tag(), "ignoring event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_protocol::{
        ArchiveEntry, ChannelId, GameEntry, GameType, Players, Prop, Score,
        SgfEvent, User,
    };

    fn roster(id: u64, move_num: u32) -> Event {
        Event::GameList {
            channel_id: ChannelId(1),
            games: vec![GameEntry {
                channel_id: ChannelId(id),
                game_type: GameType::Free,
                players: Players::new(User::named("a"), User::named("b")),
                move_num,
                score: None,
            }],
        }
    }

    fn archive_entry(game_type: GameType, black: &str) -> ArchiveEntry {
        ArchiveEntry {
            timestamp: "2020-05-05T10:00:00.000Z".into(),
            game_type,
            players: Players::new(User::named(black), User::named("bob")),
            score: Some(Score::Margin(-3.5)),
        }
    }

    fn archive_join(user: &str, games: Vec<ArchiveEntry>) -> Event {
        Event::ArchiveJoin {
            channel_id: ChannelId(900),
            user: User::named(user),
            games,
        }
    }

    #[test]
    fn test_add_then_remove_leaves_game_absent() {
        let state = SharedState::new();
        state.apply(&roster(42, 5));
        state.apply(&Event::GameContainerRemoveGame {
            channel_id: ChannelId(1),
            game_id: ChannelId(42),
        });

        assert!(state.games.get(ChannelId(42)).is_none());
    }

    #[test]
    fn test_room_join_is_a_roster_too() {
        let state = SharedState::new();
        let Event::GameList { games, .. } = roster(8, 1) else {
            unreachable!()
        };
        state.apply(&Event::RoomJoin {
            channel_id: ChannelId(2),
            games,
        });
        assert_eq!(state.games.len(), 1);
    }

    #[test]
    fn test_archive_join_excludes_reviews() {
        let state = SharedState::new();
        state.apply(&archive_join(
            "bob",
            vec![
                archive_entry(GameType::Ranked, "carol"),
                archive_entry(GameType::Review, "dave"),
                archive_entry(GameType::Free, "erin"),
            ],
        ));

        let result = state.archive.snapshot();
        let blacks: Vec<&str> =
            result.games.iter().map(|g| g.black.as_str()).collect();
        assert_eq!(result.requested_user.as_deref(), Some("bob"));
        assert_eq!(blacks, ["carol", "erin"]);
        assert_eq!(result.games[0].result, Score::Margin(-3.5));
    }

    #[test]
    fn test_second_archive_join_replaces_not_unions() {
        let state = SharedState::new();
        state.apply(&archive_join(
            "bob",
            vec![
                archive_entry(GameType::Free, "x"),
                archive_entry(GameType::Free, "y"),
            ],
        ));
        state.apply(&archive_join("bob", vec![archive_entry(GameType::Free, "z")]));

        let games = state.archive.snapshot().games;
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].black, "z");
    }

    #[test]
    fn test_comment_props_become_entries() {
        let state = SharedState::new();
        state.apply(&Event::GameUpdate {
            channel_id: ChannelId(7),
            sgf_events: vec![
                SgfEvent::PropAdded {
                    node_id: 1,
                    prop: Prop::comment("alice [4d]: hello\nbob: hi there\n"),
                },
                SgfEvent::PropGroupAdded {
                    node_id: 2,
                    props: vec![
                        Prop {
                            name: "MOVE".into(),
                            text: None,
                        },
                        Prop::comment("carol [2k]: nice"),
                    ],
                },
                SgfEvent::Other,
            ],
        });

        let comments = state.comments.drain();
        let lines: Vec<(&str, &str, &str)> = comments
            .iter()
            .map(|c| (c.author.as_str(), c.rank_label(), c.text.as_str()))
            .collect();
        assert_eq!(
            lines,
            [
                ("alice", "4d", "hello"),
                ("bob", "NO_RANK", "hi there"),
                ("carol", "2k", "nice"),
            ]
        );
        assert!(comments.iter().all(|c| c.channel_id == ChannelId(7)));
    }

    #[test]
    fn test_non_comment_props_are_ignored() {
        let state = SharedState::new();
        state.apply(&Event::GameJoin {
            channel_id: ChannelId(7),
            sgf_events: vec![SgfEvent::PropAdded {
                node_id: 0,
                prop: Prop {
                    name: "RULES".into(),
                    text: Some("japanese".into()),
                },
            }],
        });
        assert!(state.comments.is_empty());
    }

    #[test]
    fn test_unknown_event_changes_nothing() {
        let state = SharedState::new();
        state.apply(&roster(1, 1));
        state.apply(&Event::Unknown);

        assert_eq!(state.games.len(), 1);
        assert!(state.comments.is_empty());
        assert_eq!(state.archive.requested_user(), None);
    }
}
