//! The archive slot and its request/response correlation.
//!
//! Asking for a player's archive is asynchronous end to end:
//!
//! ```text
//! caller: begin_request("bob") ──→ slot cleared, waiter registered
//! caller: enqueue JOIN_ARCHIVE_REQUEST ──→ session loop ──→ server
//! server: ARCHIVE_JOIN {user: bob} ──→ dispatcher: complete("bob", games)
//!                                         └──→ waiter for "bob" woken
//! ```
//!
//! Instead of re-checking the slot on a timer, each waiter holds a
//! `oneshot` receiver filed under the user it asked for. A confirmation
//! for "alice" wakes only alice's waiters; bob's keep waiting.
//!
//! Account names on KGS are case-insensitive and the server answers with
//! the canonical spelling, so waiters are keyed by the lowercased name.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::{ArchiveError, ArchiveGame, ArchiveResult, lock};

/// What a waiter finally receives.
pub type ArchiveReply = Result<Vec<ArchiveGame>, ArchiveError>;

#[derive(Debug, Default)]
struct Inner {
    result: ArchiveResult,
    waiters: HashMap<String, Vec<oneshot::Sender<ArchiveReply>>>,
}

/// Single-slot archive result plus the callers waiting on it.
#[derive(Debug, Default)]
pub struct ArchiveSlot {
    inner: Mutex<Inner>,
}

impl ArchiveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a request for `user`'s archive.
    ///
    /// Clears `requested_user` so the previous result reads as stale, and
    /// files a waiter under `user`. Register *before* sending the request
    /// so the confirmation can't slip past.
    pub fn begin_request(&self, user: &str) -> ArchiveWaiter {
        let (tx, rx) = oneshot::channel();
        let mut inner = lock(&self.inner);

        let previous = inner.result.requested_user.take();
        // Waiters that gave up (timed out, dropped) leave closed senders.
        inner.waiters.retain(|_, senders| {
            senders.retain(|s| !s.is_closed());
            !senders.is_empty()
        });
        inner.waiters.entry(key(user)).or_default().push(tx);

        ArchiveWaiter {
            user: user.to_owned(),
            previous,
            rx,
        }
    }

    /// Undoes the invalidation done by [`begin_request`](Self::begin_request)
    /// for a request that will never be answered.
    ///
    /// Only fills an empty slot: a confirmation that landed in the
    /// meantime is newer than `previous` and stays.
    pub fn restore(&self, previous: Option<String>) {
        let mut inner = lock(&self.inner);
        if inner.result.requested_user.is_none() {
            inner.result.requested_user = previous;
        }
    }

    /// Records the server's confirmation for `user`: full replace of the
    /// slot, then every waiter for that user gets a copy of the games.
    pub fn complete(&self, user: &str, games: Vec<ArchiveGame>) -> usize {
        let mut inner = lock(&self.inner);
        inner.result = ArchiveResult {
            requested_user: Some(user.to_owned()),
            games,
        };

        let waiters = inner.waiters.remove(&key(user)).unwrap_or_default();
        let woken = waiters.len();
        for waiter in waiters {
            // A dropped receiver just means that caller stopped waiting.
            let _ = waiter.send(Ok(inner.result.games.clone()));
        }
        woken
    }

    /// The server has no account named `user`: its waiters get an error.
    /// The slot itself is left as it was.
    pub fn reject(&self, user: &str) -> usize {
        let waiters = lock(&self.inner)
            .waiters
            .remove(&key(user))
            .unwrap_or_default();
        let woken = waiters.len();
        for waiter in waiters {
            let _ = waiter.send(Err(ArchiveError::NoSuchUser(user.to_owned())));
        }
        woken
    }

    /// A copy of the slot, whatever state it is in.
    pub fn snapshot(&self) -> ArchiveResult {
        lock(&self.inner).result.clone()
    }

    /// Whose archive the slot currently holds, if confirmed.
    pub fn requested_user(&self) -> Option<String> {
        lock(&self.inner).result.requested_user.clone()
    }
}

fn key(user: &str) -> String {
    user.to_lowercase()
}

/// A caller's pending archive request, returned by
/// [`ArchiveSlot::begin_request`].
#[derive(Debug)]
pub struct ArchiveWaiter {
    user: String,
    previous: Option<String>,
    rx: oneshot::Receiver<ArchiveReply>,
}

impl ArchiveWaiter {
    /// The user this waiter is waiting for.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Whose archive the slot held before this request cleared it.
    pub fn previous_user(&self) -> Option<&str> {
        self.previous.as_deref()
    }

    /// Waits for the confirmation, however long it takes.
    ///
    /// There is deliberately no built-in bound: if the server never
    /// answers, this never returns. Use [`ArchiveWaiter::wait_timeout`]
    /// when latency matters.
    pub async fn wait(self) -> ArchiveReply {
        self.rx.await.map_err(|_| ArchiveError::Closed)?
    }

    /// Like [`ArchiveWaiter::wait`], giving up after `after`.
    pub async fn wait_timeout(self, after: Duration) -> ArchiveReply {
        let user = self.user;
        match tokio::time::timeout(after, self.rx).await {
            Ok(reply) => reply.map_err(|_| ArchiveError::Closed)?,
            Err(_) => Err(ArchiveError::TimedOut { user, after }),
        }
    }
}
