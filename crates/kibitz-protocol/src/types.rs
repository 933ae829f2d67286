//! Core protocol types for the KGS JSON wire format.
//!
//! Every type in this module travels "on the wire": it is the exact shape
//! of a JSON object the KGS server sends us or expects from us. The field
//! names are not ours to choose: `channelId`, `gameType`, `moveNum` and
//! friends must match the server byte for byte, which is why most types
//! carry serde renaming attributes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a server-side channel: a room, a game, or an archive.
///
/// A game's channel id doubles as its game id, so the same newtype is used
/// for both. `#[serde(transparent)]` keeps it a plain number in JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// A user as embedded in game and archive listings.
///
/// KGS sends more fields (`flags`, `authLevel`, …); serde ignores the ones
/// we don't declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account name, unique on the server.
    pub name: String,

    /// Rank such as `"4d"` or `"12k"`. Absent for unranked accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<String>,
}

impl User {
    /// Creates an unranked user.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rank: None,
        }
    }
}

/// The player roles of a game listing.
///
/// Reviews and demonstrations use other roles (`owner`, …), so both
/// colours are optional here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white: Option<User>,
}

impl Players {
    /// Shorthand for a two-player listing.
    pub fn new(black: User, white: User) -> Self {
        Self {
            black: Some(black),
            white: Some(white),
        }
    }

    /// Both names, when both seats are filled.
    pub fn names(&self) -> Option<(&str, &str)> {
        match (&self.black, &self.white) {
            (Some(b), Some(w)) => Some((b.name.as_str(), w.name.as_str())),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// GameType
// ---------------------------------------------------------------------------

/// The `gameType` of a listing.
///
/// Only three kinds matter to the state model: `free` and `ranked` are
/// games in active play, `review` is a finished game being discussed.
/// Everything else (`teaching`, `rengo`, `demonstration`, …) is kept
/// verbatim in [`GameType::Other`] so re-encoding is lossless.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GameType {
    Free,
    Ranked,
    Review,
    Other(String),
}

impl GameType {
    /// `true` for the kinds tracked as active games (and kept in archives).
    pub fn is_active_play(&self) -> bool {
        matches!(self, Self::Free | Self::Ranked)
    }

    /// `true` when the listing is a review of an earlier game.
    pub fn is_review(&self) -> bool {
        matches!(self, Self::Review)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Free => "free",
            Self::Ranked => "ranked",
            Self::Review => "review",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for GameType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "free" => Self::Free,
            "ranked" => Self::Ranked,
            "review" => Self::Review,
            _ => Self::Other(s),
        }
    }
}

impl From<GameType> for String {
    fn from(t: GameType) -> Self {
        match t {
            GameType::Other(s) => s,
            known => known.as_str().to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// The enumerated result codes KGS uses when a game has no point margin.
///
/// `B+` means black wins, `W+` white wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Unknown,
    Unfinished,
    NoResult,
    BlackResign,
    WhiteResign,
    BlackForfeit,
    WhiteForfeit,
    BlackTime,
    WhiteTime,
}

impl ResultCode {
    /// The wire spelling, e.g. `"B+RESIGN"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Unfinished => "UNFINISHED",
            Self::NoResult => "NO_RESULT",
            Self::BlackResign => "B+RESIGN",
            Self::WhiteResign => "W+RESIGN",
            Self::BlackForfeit => "B+FORFEIT",
            Self::WhiteForfeit => "W+FORFEIT",
            Self::BlackTime => "B+TIME",
            Self::WhiteTime => "W+TIME",
        }
    }
}

impl FromStr for ResultCode {
    type Err = std::convert::Infallible;

    /// Codes this client doesn't know collapse to [`ResultCode::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "UNFINISHED" => Self::Unfinished,
            "NO_RESULT" => Self::NoResult,
            "B+RESIGN" => Self::BlackResign,
            "W+RESIGN" => Self::WhiteResign,
            "B+FORFEIT" => Self::BlackForfeit,
            "W+FORFEIT" => Self::WhiteForfeit,
            "B+TIME" => Self::BlackTime,
            "W+TIME" => Self::WhiteTime,
            _ => Self::Unknown,
        })
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `score` of a game: a signed point margin or a result code.
///
/// A positive margin is a black win, a negative one a white win. On the
/// wire the two shapes are a bare number and a bare string, so serde goes
/// through the untagged [`RawScore`] helper.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScore", into = "RawScore")]
pub enum Score {
    Margin(f64),
    Code(ResultCode),
}

impl Score {
    /// The value used when a listing carries no `score` at all.
    pub const UNFINISHED: Score = Score::Code(ResultCode::Unfinished);
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Margin(m) => write!(f, "{m}"),
            Self::Code(c) => c.fmt(f),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawScore {
    Margin(f64),
    Code(String),
}

impl From<RawScore> for Score {
    fn from(raw: RawScore) -> Self {
        match raw {
            RawScore::Margin(m) => Self::Margin(m),
            RawScore::Code(s) => match s.parse() {
                Ok(code) => Self::Code(code),
                Err(never) => match never {},
            },
        }
    }
}

impl From<Score> for RawScore {
    fn from(score: Score) -> Self {
        match score {
            Score::Margin(m) => Self::Margin(m),
            Score::Code(c) => Self::Code(c.as_str().to_owned()),
        }
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// One game in a room or global-list roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEntry {
    /// The game's channel, which is also its identity.
    pub channel_id: ChannelId,
    pub game_type: GameType,
    #[serde(default)]
    pub players: Players,
    /// Moves played so far.
    #[serde(default)]
    pub move_num: u32,
    /// Absent while the game is still being played.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

/// One game in a player's archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    /// Start time as sent by the server (`"2021-03-04T05:06:07.000Z"`).
    pub timestamp: String,
    pub game_type: GameType,
    #[serde(default)]
    pub players: Players,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
}

// ---------------------------------------------------------------------------
// Game record events
// ---------------------------------------------------------------------------

/// A property of a game-record node. Only `name` and `text` are read;
/// coordinates and colours of move properties are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prop {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Prop {
    /// Property name carrying kibitz chat.
    pub const COMMENT: &'static str = "COMMENT";

    /// Builds a `COMMENT` property.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            name: Self::COMMENT.to_owned(),
            text: Some(text.into()),
        }
    }

    /// The text of a `COMMENT` property, `None` for anything else.
    pub fn comment_text(&self) -> Option<&str> {
        if self.name == Self::COMMENT {
            self.text.as_deref()
        } else {
            None
        }
    }
}

/// An edit to a game record, delivered inside `GAME_JOIN`/`GAME_UPDATE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum SgfEvent {
    PropAdded {
        #[serde(default)]
        node_id: u64,
        prop: Prop,
    },
    PropGroupAdded {
        #[serde(default)]
        node_id: u64,
        props: Vec<Prop>,
    },
    /// Node moves, deletions, and everything else not read here.
    #[serde(other)]
    Other,
}

impl SgfEvent {
    /// Texts of the `COMMENT` properties this edit adds, in order.
    pub fn comments(&self) -> Vec<&str> {
        match self {
            Self::PropAdded { prop, .. } => {
                prop.comment_text().into_iter().collect()
            }
            Self::PropGroupAdded { props, .. } => {
                props.iter().filter_map(Prop::comment_text).collect()
            }
            Self::Other => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event: server → client
// ---------------------------------------------------------------------------

/// A message pushed by the server, as found in a poll response.
///
/// `#[serde(tag = "type")]` matches KGS's internally tagged objects:
///   `{ "type": "GAME_LIST", "channelId": 3, "games": [...] }`
///
/// `#[serde(other)]` on [`Event::Unknown`] makes every tag this client
/// doesn't model decode successfully instead of failing the whole poll.
/// The server's vocabulary is much larger than what we consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    /// We joined a room; carries the room's current games.
    RoomJoin {
        channel_id: ChannelId,
        #[serde(default)]
        games: Vec<GameEntry>,
    },

    /// Games added or changed in a room or global list.
    GameList {
        channel_id: ChannelId,
        #[serde(default)]
        games: Vec<GameEntry>,
    },

    /// A game left a room or list.
    GameContainerRemoveGame {
        channel_id: ChannelId,
        game_id: ChannelId,
    },

    /// The archive we asked for, for `user`.
    ArchiveJoin {
        channel_id: ChannelId,
        user: User,
        #[serde(default)]
        games: Vec<ArchiveEntry>,
    },

    /// The archive we asked for belongs to no account. (Server spelling.)
    ArchiveNonexistant { name: String },

    /// We joined a game; carries its record so far.
    GameJoin {
        channel_id: ChannelId,
        #[serde(default)]
        sgf_events: Vec<SgfEvent>,
    },

    /// New edits to the record of a game we're in.
    GameUpdate {
        channel_id: ChannelId,
        #[serde(default)]
        sgf_events: Vec<SgfEvent>,
    },

    /// Any tag not listed above.
    #[serde(other)]
    Unknown,
}

impl Event {
    /// The wire tag, for logging.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::RoomJoin { .. } => "ROOM_JOIN",
            Self::GameList { .. } => "GAME_LIST",
            Self::GameContainerRemoveGame { .. } => {
                "GAME_CONTAINER_REMOVE_GAME"
            }
            Self::ArchiveJoin { .. } => "ARCHIVE_JOIN",
            Self::ArchiveNonexistant { .. } => "ARCHIVE_NONEXISTANT",
            Self::GameJoin { .. } => "GAME_JOIN",
            Self::GameUpdate { .. } => "GAME_UPDATE",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Games of a roster event (room snapshot or list update).
    pub fn roster(&self) -> Option<&[GameEntry]> {
        match self {
            Self::RoomJoin { games, .. } | Self::GameList { games, .. } => {
                Some(games)
            }
            _ => None,
        }
    }

    /// The game a removal event drops.
    pub fn removed_game(&self) -> Option<ChannelId> {
        match self {
            Self::GameContainerRemoveGame { game_id, .. } => Some(*game_id),
            _ => None,
        }
    }

    /// Confirmed user and games of an archive join.
    pub fn archive_join(&self) -> Option<(&User, &[ArchiveEntry])> {
        match self {
            Self::ArchiveJoin { user, games, .. } => Some((user, games)),
            _ => None,
        }
    }

    /// Channel and record edits of a game join/update.
    pub fn record_events(&self) -> Option<(ChannelId, &[SgfEvent])> {
        match self {
            Self::GameJoin {
                channel_id,
                sgf_events,
            }
            | Self::GameUpdate {
                channel_id,
                sgf_events,
            } => Some((*channel_id, sgf_events)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request: client → server
// ---------------------------------------------------------------------------

/// Which global list to subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalList {
    /// Games currently being played.
    Actives,
    Challenges,
    Fans,
}

/// A message the client posts to the server.
///
/// Same tagging scheme as [`Event`]:
///   `{ "type": "JOIN_REQUEST", "channelId": 42 }`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    /// Opens a session. Sent by the transport's `login`, never queued.
    Login {
        name: String,
        password: String,
        locale: String,
    },

    /// Subscribe to a global list (roster updates arrive as `GAME_LIST`).
    GlobalListJoinRequest { list: GlobalList },

    /// Join a room or game channel.
    JoinRequest { channel_id: ChannelId },

    /// Ask for a user's archive (answered by `ARCHIVE_JOIN`).
    JoinArchiveRequest { name: String },

    /// End the session.
    Logout,
}

impl Request {
    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "LOGIN",
            Self::GlobalListJoinRequest { .. } => "GLOBAL_LIST_JOIN_REQUEST",
            Self::JoinRequest { .. } => "JOIN_REQUEST",
            Self::JoinArchiveRequest { .. } => "JOIN_ARCHIVE_REQUEST",
            Self::Logout => "LOGOUT",
        }
    }
}

// Hand-written so a logged LOGIN never shows the password.
impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login { name, locale, .. } => f
                .debug_struct("Login")
                .field("name", name)
                .field("password", &"<redacted>")
                .field("locale", locale)
                .finish(),
            Self::GlobalListJoinRequest { list } => f
                .debug_struct("GlobalListJoinRequest")
                .field("list", list)
                .finish(),
            Self::JoinRequest { channel_id } => f
                .debug_struct("JoinRequest")
                .field("channel_id", channel_id)
                .finish(),
            Self::JoinArchiveRequest { name } => f
                .debug_struct("JoinArchiveRequest")
                .field("name", name)
                .finish(),
            Self::Logout => f.write_str("Logout"),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
