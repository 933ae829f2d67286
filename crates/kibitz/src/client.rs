//! `KibitzClient` builder and the public query/request API.
//!
//! This is the entry point for using Kibitz. It ties the layers
//! together: transport → session loop → inbound queue → dispatcher →
//! shared state → the read accessors below.

use std::sync::Arc;
use std::time::Duration;

use kibitz_protocol::{ChannelId, GlobalList, Request};
use kibitz_session::{
    LoopStatus, OutboundSender, SessionConfig, SessionHandle, SessionLoop,
    outbound_queue, spawn_session, wait_finished,
};
use kibitz_state::{
    ArchiveGame, ArchiveReply, ArchiveResult, ArchiveWaiter, CommentEntry,
    DispatcherHandle, GameSummary, SharedState, inbound_queue,
    spawn_dispatcher,
};
use kibitz_transport::{Credentials, Transport};

use crate::KibitzError;

/// Builder for configuring and connecting a [`KibitzClient`].
///
/// # Example
///
/// ```rust,no_run
/// use kibitz::prelude::*;
///
/// # async fn demo() -> Result<(), KibitzError> {
/// let client = KibitzClient::builder(Credentials::new("watcher", "secret"))
///     .connect_http()
///     .await?;
/// for game in client.list_active_games() {
///     println!("{} vs {}", game.black, game.white);
/// }
/// client.shutdown().await
/// # }
/// ```
pub struct KibitzClientBuilder {
    credentials: Credentials,
    session_config: SessionConfig,
    join_global_list: bool,
    #[cfg(feature = "http")]
    http_config: kibitz_transport::HttpConfig,
}

impl KibitzClientBuilder {
    /// Creates a builder with default settings.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            session_config: SessionConfig::default(),
            join_global_list: true,
            #[cfg(feature = "http")]
            http_config: kibitz_transport::HttpConfig::default(),
        }
    }

    /// Sets the session loop's timing.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Whether to subscribe to the server's list of games in play right
    /// after login. On by default; without it the game table only fills
    /// from rooms joined explicitly.
    pub fn join_global_list(mut self, join: bool) -> Self {
        self.join_global_list = join;
        self
    }

    /// Sets the endpoint and request timeout used by
    /// [`connect_http`](Self::connect_http).
    #[cfg(feature = "http")]
    pub fn http_config(mut self, config: kibitz_transport::HttpConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Logs in over the KGS JSON HTTP endpoint.
    #[cfg(feature = "http")]
    pub async fn connect_http(self) -> Result<KibitzClient, KibitzError> {
        let transport =
            kibitz_transport::HttpTransport::new(self.http_config.clone());
        self.connect(transport).await
    }

    /// Logs in through `transport` and starts the session loop and the
    /// dispatcher.
    ///
    /// # Errors
    /// Returns [`KibitzError::Auth`] if login fails. Nothing is spawned
    /// in that case.
    pub async fn connect<T: Transport>(
        self,
        transport: T,
    ) -> Result<KibitzClient, KibitzError> {
        let transport = Arc::new(transport);
        let token = transport.login(&self.credentials).await?;
        tracing::info!(user = %self.credentials.name, "logged in");

        let state = Arc::new(SharedState::new());
        let (inbound_tx, inbound_rx) = inbound_queue();
        let dispatcher = spawn_dispatcher(Arc::clone(&state), inbound_rx);

        let (outbound, outbound_rx) = outbound_queue();
        if self.join_global_list {
            enqueue(
                &outbound,
                Request::GlobalListJoinRequest {
                    list: GlobalList::Actives,
                },
            )?;
        }

        let session = SessionLoop::new(transport, token, outbound_rx, inbound_tx)
            .with_config(self.session_config);
        let session = spawn_session(session);

        Ok(KibitzClient {
            state,
            outbound,
            session,
            dispatcher,
        })
    }
}

/// A logged-in session and the state it keeps current.
///
/// Read accessors hand out copies and never block on the network, so any
/// number of tasks or threads can call them while the session runs.
/// After the loop stops (or fails) they keep returning the last known
/// state.
///
/// Dropping the client closes the request queue; the loop notices on its
/// next idle cycle, logs out, and stops.
pub struct KibitzClient {
    state: Arc<SharedState>,
    outbound: OutboundSender,
    session: SessionHandle,
    dispatcher: DispatcherHandle,
}

impl KibitzClient {
    /// Creates a new builder.
    pub fn builder(credentials: Credentials) -> KibitzClientBuilder {
        KibitzClientBuilder::new(credentials)
    }

    // -- reads --------------------------------------------------------------

    /// The games currently in play, in no particular order.
    pub fn list_active_games(&self) -> Vec<GameSummary> {
        self.state.games.snapshot()
    }

    /// Every comment received since the previous call.
    pub fn drain_comments(&self) -> Vec<CommentEntry> {
        self.state.comments.drain()
    }

    /// The archive slot as it is right now. `requested_user` is `None`
    /// while a request is outstanding.
    pub fn archive(&self) -> ArchiveResult {
        self.state.archive.snapshot()
    }

    // -- requests -----------------------------------------------------------

    /// Asks for `user`'s archive and waits for the server to confirm it.
    ///
    /// There is no time limit: if the server never answers while the
    /// session stays up, this never returns. It does return once the
    /// session loop ends. Use
    /// [`request_archive_timeout`](Self::request_archive_timeout) to bound
    /// the wait.
    ///
    /// # Errors
    /// - [`ArchiveError::NoSuchUser`](kibitz_state::ArchiveError::NoSuchUser)
    ///   when the server knows no such account
    /// - [`KibitzError::SessionEnded`] when the loop has stopped, or stops
    ///   before the confirmation arrives. The archive slot is left as it
    ///   was before the call.
    pub async fn request_archive(
        &self,
        user: &str,
    ) -> Result<Vec<ArchiveGame>, KibitzError> {
        let waiter = self.begin_archive_request(user)?;
        let previous = waiter.previous_user().map(str::to_owned);
        self.await_archive(waiter.wait(), previous).await
    }

    /// Like [`request_archive`](Self::request_archive), giving up with
    /// [`ArchiveError::TimedOut`](kibitz_state::ArchiveError::TimedOut)
    /// after `after`.
    pub async fn request_archive_timeout(
        &self,
        user: &str,
        after: Duration,
    ) -> Result<Vec<ArchiveGame>, KibitzError> {
        let waiter = self.begin_archive_request(user)?;
        let previous = waiter.previous_user().map(str::to_owned);
        self.await_archive(waiter.wait_timeout(after), previous).await
    }

    /// Queues a join for a game or room channel.
    pub fn enqueue_join_channel(
        &self,
        channel_id: ChannelId,
    ) -> Result<(), KibitzError> {
        enqueue(&self.outbound, Request::JoinRequest { channel_id })
    }

    /// Queues a logout. The loop stops cleanly once it has been sent.
    pub fn enqueue_logout(&self) -> Result<(), KibitzError> {
        enqueue(&self.outbound, Request::Logout)
    }

    // -- lifecycle ----------------------------------------------------------

    pub fn status(&self) -> LoopStatus {
        self.session.status()
    }

    /// Waits until the session loop has ended and returns how.
    pub async fn wait_for_exit(&self) -> LoopStatus {
        self.session.wait_for_exit().await
    }

    /// Stops the loop, logs out, and waits for both tasks to finish.
    ///
    /// A poll in flight is not interrupted, so this can take up to one
    /// poll timeout.
    ///
    /// # Errors
    /// Returns the loop's own error if it had already failed.
    pub async fn shutdown(self) -> Result<(), KibitzError> {
        let Self {
            outbound,
            session,
            dispatcher,
            ..
        } = self;

        session.stop();
        drop(outbound);
        let result = session.join().await;

        // The loop dropped its inbound sender, so the dispatcher drains
        // what is left and exits.
        if let Err(e) = dispatcher.join().await {
            tracing::warn!(error = %e, "dispatcher task ended abnormally");
        }

        result.map_err(KibitzError::from)
    }

    fn begin_archive_request(
        &self,
        user: &str,
    ) -> Result<ArchiveWaiter, KibitzError> {
        let status = self.session.status();
        if status.is_finished() {
            return Err(KibitzError::SessionEnded(status));
        }
        if self.outbound.is_closed() {
            return Err(KibitzError::QueueClosed);
        }

        // Register first: the confirmation may arrive before `enqueue`
        // even returns.
        let waiter = self.state.archive.begin_request(user);
        let request = Request::JoinArchiveRequest {
            name: user.to_owned(),
        };
        if let Err(e) = enqueue(&self.outbound, request) {
            self.state
                .archive
                .restore(waiter.previous_user().map(str::to_owned));
            return Err(e);
        }
        tracing::debug!(user, "archive requested");
        Ok(waiter)
    }

    /// Waits for `reply` until the dispatcher has applied everything the
    /// loop received. A confirmation pushed just before the loop stopped
    /// still wins over the session ending.
    async fn await_archive(
        &self,
        reply: impl Future<Output = ArchiveReply>,
        previous: Option<String>,
    ) -> Result<Vec<ArchiveGame>, KibitzError> {
        tokio::select! {
            biased;
            reply = reply => Ok(reply?),
            () = self.dispatcher.wait_drained() => {
                self.state.archive.restore(previous);
                let status = wait_finished(self.session.subscribe()).await;
                tracing::debug!(%status, "session ended before archive arrived");
                Err(KibitzError::SessionEnded(status))
            }
        }
    }
}

fn enqueue(outbound: &OutboundSender, request: Request) -> Result<(), KibitzError> {
    let kind = request.kind();
    outbound.send(request).map_err(|_| KibitzError::QueueClosed)?;
    tracing::debug!(kind, "request queued");
    Ok(())
}
