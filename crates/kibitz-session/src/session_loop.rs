//! The long-poll cycle: one task that owns the session token and
//! multiplexes inbound events and outbound requests over the transport.
//!
//! ```text
//!   ┌──────────── one cycle ─────────────┐
//!   │ 1. stop signal set?  → exit        │
//!   │ 2. poll (bounded)    → events      │──→ inbound queue ──→ dispatcher
//!   │ 3. one queued request? → send      │←── outbound queue ←── client API
//!   │    otherwise           → idle pause│
//!   └────────────────────────────────────┘
//! ```
//!
//! Any transport failure ends the loop. There is no retry: the owner
//! decides whether to log in again.

use std::sync::Arc;

use kibitz_protocol::{Event, Request};
use kibitz_transport::{Transport, TransportError};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{LoopStatus, SessionConfig, SessionError, StopSignal};

/// Producer side of the outbound queue, held by the client API.
pub type OutboundSender = mpsc::UnboundedSender<Request>;

/// Consumer side of the outbound queue, owned by the session loop.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Request>;

/// Creates the outbound queue.
pub fn outbound_queue() -> (OutboundSender, OutboundReceiver) {
    mpsc::unbounded_channel()
}

/// Why a loop that didn't fail stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    StopSignal,
    /// A queued `LOGOUT` went out; the server has closed the session.
    LoggedOut,
    /// Every outbound sender is gone, so no owner is left.
    OutboundClosed,
}

impl Exit {
    fn as_str(self) -> &'static str {
        match self {
            Self::StopSignal => "stop signal",
            Self::LoggedOut => "logout sent",
            Self::OutboundClosed => "outbound queue closed",
        }
    }
}

/// One authenticated session's poll/send loop.
///
/// Build it with the token from [`Transport::login`] and both queues,
/// then hand it to [`spawn_session`] (or `.await` [`SessionLoop::run`]
/// directly).
pub struct SessionLoop<T: Transport> {
    transport: Arc<T>,
    token: T::Token,
    config: SessionConfig,
    outbound: OutboundReceiver,
    inbound: mpsc::UnboundedSender<Event>,
    stop: StopSignal,
    status: watch::Sender<LoopStatus>,
}

impl<T: Transport> SessionLoop<T> {
    pub fn new(
        transport: Arc<T>,
        token: T::Token,
        outbound: OutboundReceiver,
        inbound: mpsc::UnboundedSender<Event>,
    ) -> Self {
        let (status, _) = watch::channel(LoopStatus::Running);
        Self {
            transport,
            token,
            config: SessionConfig::default(),
            outbound,
            inbound,
            stop: StopSignal::new(),
            status,
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses an existing stop signal instead of a fresh one.
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// A receiver for the loop's status. Stays readable after the loop
    /// has ended.
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    /// Runs cycles until stopped or failed, then publishes the final
    /// [`LoopStatus`].
    ///
    /// On a clean exit the session is logged out first (unless a queued
    /// `LOGOUT` already did that). A failed loop skips logout since the
    /// transport is presumed broken.
    pub async fn run(mut self) -> Result<(), SessionError> {
        tracing::info!(
            poll_timeout = ?self.config.poll_timeout,
            idle_pause = ?self.config.idle_pause,
            "session loop started"
        );

        let outcome = self.drive().await;
        let status = match outcome {
            Ok(exit) => {
                tracing::info!(reason = exit.as_str(), "session loop stopped");
                if exit != Exit::LoggedOut {
                    self.logout().await;
                }
                LoopStatus::Stopped
            }
            Err(ref e) => {
                tracing::error!(error = %e, "session loop failed");
                LoopStatus::Failed(e.to_string())
            }
        };

        self.status.send_replace(status);
        outcome.map(|_| ())
    }

    async fn drive(&mut self) -> Result<Exit, SessionError> {
        loop {
            if self.stop.is_stopped() {
                return Ok(Exit::StopSignal);
            }

            let events = self.poll().await?;
            if !events.is_empty() {
                tracing::debug!(count = events.len(), "events received");
            }
            for event in events {
                self.inbound
                    .send(event)
                    .map_err(|_| SessionError::InboundClosed)?;
            }

            match self.outbound.try_recv() {
                Ok(request) => {
                    self.transport.send(&self.token, &request).await?;
                    tracing::debug!(kind = request.kind(), "request sent");
                    if matches!(request, Request::Logout) {
                        return Ok(Exit::LoggedOut);
                    }
                }
                Err(TryRecvError::Empty) => {
                    tokio::time::sleep(self.config.idle_pause).await;
                }
                Err(TryRecvError::Disconnected) => {
                    return Ok(Exit::OutboundClosed);
                }
            }
        }
    }

    async fn poll(&self) -> Result<Vec<Event>, TransportError> {
        let after = self.config.poll_timeout;
        tokio::time::timeout(after, self.transport.poll(&self.token))
            .await
            .map_err(|_| TransportError::Timeout {
                operation: "poll",
                after,
            })?
    }

    async fn logout(&self) {
        match self.transport.logout(&self.token).await {
            Ok(()) => tracing::info!("logged out"),
            Err(e) => tracing::warn!(error = %e, "logout failed"),
        }
    }
}

/// A running session loop.
pub struct SessionHandle {
    stop: StopSignal,
    status: watch::Receiver<LoopStatus>,
    task: JoinHandle<Result<(), SessionError>>,
}

/// Spawns the loop onto the current Tokio runtime.
pub fn spawn_session<T: Transport>(session: SessionLoop<T>) -> SessionHandle {
    let stop = session.stop_signal();
    let status = session.subscribe();
    let task = tokio::spawn(session.run());
    SessionHandle { stop, status, task }
}

impl SessionHandle {
    /// Asks the loop to stop at the top of its next cycle.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// The latest published status.
    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.clone()
    }

    /// Waits until the loop has ended and returns how it ended.
    pub async fn wait_for_exit(&self) -> LoopStatus {
        wait_finished(self.status.clone()).await
    }

    /// Waits for the task and returns the loop's own result.
    pub async fn join(self) -> Result<(), SessionError> {
        self.task.await?
    }
}

/// Resolves once `status` leaves [`LoopStatus::Running`].
///
/// A loop that vanished without publishing (a panic, an abort) reads as
/// failed.
pub async fn wait_finished(mut status: watch::Receiver<LoopStatus>) -> LoopStatus {
    match status.wait_for(LoopStatus::is_finished).await {
        Ok(finished) => finished.clone(),
        Err(_) => {
            LoopStatus::Failed("session loop exited without a status".into())
        }
    }
}
