//! End-to-end tests for `KibitzClient` against an in-memory fake server.
//!
//! The fake answers polls with whatever the test pushes plus any replies
//! its responder produced for requests sent earlier, so the full path
//! from public API through session loop, dispatcher, and shared state
//! back to the accessors is exercised.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use kibitz::prelude::*;
use kibitz::protocol::{
    ArchiveEntry, Event, GameEntry, GameType, GlobalList, Players, Prop,
    Request, SgfEvent, User,
};
use kibitz::session::SessionError;
use kibitz::transport::{AuthError, TransportError};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Fake server
// ---------------------------------------------------------------------------

type Responder = fn(&Request) -> Vec<Event>;

struct FakeKgs {
    pushed: tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<Event>>>,
    replies: Mutex<VecDeque<Event>>,
    respond: Responder,
    sent: mpsc::UnboundedSender<Request>,
    logged_out: Arc<AtomicBool>,
}

/// The test's side of a [`FakeKgs`].
struct Server {
    push: mpsc::UnboundedSender<Vec<Event>>,
    sent: mpsc::UnboundedReceiver<Request>,
    logged_out: Arc<AtomicBool>,
}

impl Server {
    fn push(&self, events: Vec<Event>) {
        self.push.send(events).expect("fake server gone");
    }

    /// Makes every later poll fail.
    fn break_polls(self) -> mpsc::UnboundedReceiver<Request> {
        self.sent
    }

    async fn next_sent(&mut self) -> Request {
        tokio::time::timeout(Duration::from_secs(2), self.sent.recv())
            .await
            .expect("no request sent in time")
            .expect("fake server gone")
    }
}

fn fake(respond: Responder) -> (FakeKgs, Server) {
    let (push, pushed) = mpsc::unbounded_channel();
    let (sent_tx, sent) = mpsc::unbounded_channel();
    let logged_out = Arc::new(AtomicBool::new(false));
    let transport = FakeKgs {
        pushed: tokio::sync::Mutex::new(pushed),
        replies: Mutex::new(VecDeque::new()),
        respond,
        sent: sent_tx,
        logged_out: Arc::clone(&logged_out),
    };
    let server = Server {
        push,
        sent,
        logged_out,
    };
    (transport, server)
}

fn silent(_: &Request) -> Vec<Event> {
    Vec::new()
}

impl Transport for FakeKgs {
    type Token = u64;

    async fn login(&self, credentials: &Credentials) -> Result<u64, AuthError> {
        if credentials.password.is_empty() {
            return Err(AuthError::Rejected(401));
        }
        Ok(1)
    }

    async fn poll(&self, _: &u64) -> Result<Vec<Event>, TransportError> {
        let replies: Vec<Event> = self.replies.lock().unwrap().drain(..).collect();
        if !replies.is_empty() {
            return Ok(replies);
        }

        let mut pushed = self.pushed.lock().await;
        match tokio::time::timeout(Duration::from_millis(20), pushed.recv()).await
        {
            Ok(Some(events)) => Ok(events),
            Ok(None) => Err(TransportError::Status {
                operation: "poll",
                status: 500,
            }),
            Err(_) => Ok(Vec::new()),
        }
    }

    async fn send(&self, _: &u64, request: &Request) -> Result<(), TransportError> {
        let replies = (self.respond)(request);
        self.replies.lock().unwrap().extend(replies);
        let _ = self.sent.send(request.clone());
        Ok(())
    }

    async fn logout(&self, _: &u64) -> Result<(), TransportError> {
        self.logged_out.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fast() -> SessionConfig {
    SessionConfig::default()
        .idle_pause(Duration::from_millis(5))
        .poll_timeout(Duration::from_secs(1))
}

async fn connect(transport: FakeKgs) -> KibitzClient {
    KibitzClient::builder(Credentials::new("watcher", "secret"))
        .session_config(fast())
        .join_global_list(false)
        .connect(transport)
        .await
        .expect("login should succeed")
}

async fn eventually(mut check: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn game(id: u64, game_type: GameType, move_num: u32) -> GameEntry {
    GameEntry {
        channel_id: ChannelId(id),
        game_type,
        players: Players::new(User::named("black"), User::named("white")),
        move_num,
        score: None,
    }
}

fn archive_join(user: &str, count: usize) -> Event {
    Event::ArchiveJoin {
        channel_id: ChannelId(99),
        user: User::named(user),
        games: (0..count)
            .map(|i| ArchiveEntry {
                timestamp: format!("2023-03-0{}T12:00:00.000Z", i + 1),
                game_type: GameType::Ranked,
                players: Players::new(User::named(user), User::named("rival")),
                score: Some(Score::Code(ResultCode::BlackResign)),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejected_login_surfaces_auth_error() {
    let (transport, _server) = fake(silent);

    let result = KibitzClient::builder(Credentials::new("watcher", ""))
        .connect(transport)
        .await;

    assert!(matches!(
        result,
        Err(KibitzError::Auth(AuthError::Rejected(401)))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_joins_active_list_after_login_by_default() {
    let (transport, mut server) = fake(silent);

    let client = KibitzClient::builder(Credentials::new("watcher", "secret"))
        .session_config(fast())
        .connect(transport)
        .await
        .unwrap();

    assert_eq!(
        server.next_sent().await,
        Request::GlobalListJoinRequest {
            list: GlobalList::Actives
        }
    );
    client.shutdown().await.unwrap();
}

// ---------------------------------------------------------------------------
// Game table
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rosters_and_removals_reach_the_game_table() {
    let (transport, server) = fake(silent);
    let client = connect(transport).await;

    server.push(vec![Event::GameList {
        channel_id: ChannelId(1),
        games: vec![
            game(10, GameType::Free, 5),
            game(11, GameType::Ranked, 80),
            game(12, GameType::Review, 0),
        ],
    }]);
    eventually(|| client.list_active_games().len() == 2).await;

    server.push(vec![Event::GameContainerRemoveGame {
        channel_id: ChannelId(1),
        game_id: ChannelId(10),
    }]);
    eventually(|| client.list_active_games().len() == 1).await;

    let games = client.list_active_games();
    assert_eq!(games[0].id, ChannelId(11));
    assert_eq!(games[0].move_count, 80);
    assert_eq!(games[0].result, Score::UNFINISHED);

    client.shutdown().await.unwrap();
}

// ---------------------------------------------------------------------------
// Archive
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_archive_waits_for_the_right_user() {
    fn respond(request: &Request) -> Vec<Event> {
        match request {
            // Someone else's confirmation arrives first.
            Request::JoinArchiveRequest { name } if name == "bob" => {
                vec![archive_join("alice", 4), archive_join("Bob", 2)]
            }
            _ => Vec::new(),
        }
    }
    let (transport, mut server) = fake(respond);
    let client = connect(transport).await;

    let games = client.request_archive("bob").await.unwrap();

    assert_eq!(games.len(), 2);
    assert!(games.iter().all(|g| g.black == "Bob"));
    assert_eq!(games[0].result, Score::Code(ResultCode::BlackResign));
    assert_eq!(client.archive().requested_user.as_deref(), Some("Bob"));
    assert_eq!(
        server.next_sent().await,
        Request::JoinArchiveRequest { name: "bob".into() }
    );

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unknown_archive_user_is_an_error() {
    fn respond(request: &Request) -> Vec<Event> {
        match request {
            Request::JoinArchiveRequest { name } => {
                vec![Event::ArchiveNonexistant { name: name.clone() }]
            }
            _ => Vec::new(),
        }
    }
    let (transport, _server) = fake(respond);
    let client = connect(transport).await;

    let result = client.request_archive("ghost").await;

    assert!(matches!(
        result,
        Err(KibitzError::Archive(ArchiveError::NoSuchUser(ref name))) if name == "ghost"
    ));
    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_archive_timeout_gives_up() {
    let (transport, _server) = fake(silent);
    let client = connect(transport).await;

    let result = client
        .request_archive_timeout("bob", Duration::from_millis(50))
        .await;

    assert!(matches!(
        result,
        Err(KibitzError::Archive(ArchiveError::TimedOut { .. }))
    ));
    assert_eq!(client.archive().requested_user, None);
    client.shutdown().await.unwrap();
}

fn echo_archive(request: &Request) -> Vec<Event> {
    match request {
        Request::JoinArchiveRequest { name } => vec![archive_join(name, 2)],
        _ => Vec::new(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_answered_just_before_logout_is_delivered() {
    // The confirmation is polled in the same cycle that sends LOGOUT, so
    // the loop may stop before the dispatcher has applied it.
    for _ in 0..25 {
        let (transport, _server) = fake(echo_archive);
        let client = connect(transport).await;

        let (games, logout) =
            tokio::join!(client.request_archive("bob"), async {
                client.enqueue_logout()
            });

        logout.unwrap();
        assert_eq!(games.unwrap().len(), 2);
        assert_eq!(client.wait_for_exit().await, LoopStatus::Stopped);
        assert_eq!(client.archive().requested_user.as_deref(), Some("bob"));
        client.shutdown().await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_archive_request_after_exit_keeps_last_result() {
    let (transport, _server) = fake(echo_archive);
    let client = connect(transport).await;
    client.request_archive("bob").await.unwrap();
    client.enqueue_logout().unwrap();
    assert_eq!(client.wait_for_exit().await, LoopStatus::Stopped);
    let before = client.archive();

    assert!(matches!(
        client.request_archive("carol").await,
        Err(KibitzError::SessionEnded(LoopStatus::Stopped))
    ));
    assert!(
        client
            .request_archive_timeout("carol", Duration::from_millis(50))
            .await
            .is_err()
    );

    assert_eq!(client.archive(), before);
    assert_eq!(before.requested_user.as_deref(), Some("bob"));
    assert_eq!(before.games.len(), 2);
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_joined_game_comments_drain_once() {
    fn respond(request: &Request) -> Vec<Event> {
        match request {
            Request::JoinRequest { channel_id } => vec![Event::GameJoin {
                channel_id: *channel_id,
                sgf_events: vec![SgfEvent::PropAdded {
                    node_id: 0,
                    prop: Prop::comment("alice [4d]: hello\n\nbob: hi there\n"),
                }],
            }],
            _ => Vec::new(),
        }
    }
    let (transport, _server) = fake(respond);
    let client = connect(transport).await;

    client.enqueue_join_channel(ChannelId(7)).unwrap();

    let mut comments = Vec::new();
    eventually(|| {
        comments.extend(client.drain_comments());
        comments.len() >= 2
    })
    .await;

    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].channel_id, ChannelId(7));
    assert_eq!(comments[0].author, "alice");
    assert_eq!(comments[0].rank.as_deref(), Some("4d"));
    assert_eq!(comments[1].rank_label(), "NO_RANK");
    assert_eq!(comments[1].text, "hi there");
    assert!(client.drain_comments().is_empty());

    client.shutdown().await.unwrap();
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_logs_out() {
    let (transport, server) = fake(silent);
    let client = connect(transport).await;
    assert_eq!(client.status(), LoopStatus::Running);

    client.shutdown().await.unwrap();

    assert!(server.logged_out.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_enqueued_logout_stops_the_loop() {
    let (transport, mut server) = fake(silent);
    let client = connect(transport).await;

    client.enqueue_logout().unwrap();

    assert_eq!(client.wait_for_exit().await, LoopStatus::Stopped);
    assert_eq!(server.next_sent().await, Request::Logout);
    // The LOGOUT request already closed the session.
    assert!(!server.logged_out.load(Ordering::SeqCst));
    eventually(|| client.enqueue_join_channel(ChannelId(1)).is_err()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_failed_loop_freezes_state_and_reports_error() {
    let (transport, server) = fake(silent);
    let client = connect(transport).await;

    server.push(vec![Event::GameList {
        channel_id: ChannelId(1),
        games: vec![game(3, GameType::Free, 1)],
    }]);
    eventually(|| client.list_active_games().len() == 1).await;

    // Closing the push side makes the next poll fail with a 500.
    let _sent = server.break_polls();

    let status = client.wait_for_exit().await;
    assert!(matches!(status, LoopStatus::Failed(ref r) if r.contains("500")));
    assert_eq!(client.list_active_games().len(), 1);
    assert!(matches!(
        client.request_archive("bob").await,
        Err(KibitzError::SessionEnded(LoopStatus::Failed(_)))
            | Err(KibitzError::QueueClosed)
    ));
    assert!(matches!(
        client.shutdown().await,
        Err(KibitzError::Session(SessionError::Transport(
            TransportError::Status { status: 500, .. }
        )))
    ));
}
