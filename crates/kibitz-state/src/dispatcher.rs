//! Event dispatcher: the single consumer of the inbound queue.
//!
//! Runs as its own Tokio task. The session loop pushes events into an
//! unbounded channel; the dispatcher pulls them out one at a time, in
//! arrival order, and applies each to the [`SharedState`]. Because there
//! is exactly one consumer, the state converges in the server's order no
//! matter how far behind the dispatcher runs.

use std::sync::Arc;

use kibitz_protocol::Event;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::SharedState;

/// Producer side of the inbound queue, held by the session loop.
pub type InboundSender = mpsc::UnboundedSender<Event>;

/// Consumer side of the inbound queue, owned by the dispatcher.
pub type InboundReceiver = mpsc::UnboundedReceiver<Event>;

/// Creates the inbound queue.
pub fn inbound_queue() -> (InboundSender, InboundReceiver) {
    mpsc::unbounded_channel()
}

/// Applies queued events to the shared state.
pub struct Dispatcher {
    state: Arc<SharedState>,
    inbound: InboundReceiver,
}

impl Dispatcher {
    pub fn new(state: Arc<SharedState>, inbound: InboundReceiver) -> Self {
        Self { state, inbound }
    }

    /// Runs until every sender of the inbound queue is gone.
    ///
    /// There is no other way to stop it: it is meant to live as long as
    /// the session that feeds it.
    pub async fn run(mut self) {
        tracing::info!("dispatcher started");
        let mut applied: u64 = 0;

        while let Some(event) = self.inbound.recv().await {
            self.state.apply(&event);
            applied += 1;
        }

        tracing::info!(applied, "inbound queue closed, dispatcher stopped");
    }
}

/// A running dispatcher task, returned by [`spawn_dispatcher`].
///
/// Once [`wait_drained`](Self::wait_drained) resolves, every event the
/// session loop pushed has been applied to the state.
#[derive(Debug)]
pub struct DispatcherHandle {
    drained: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    pub fn is_drained(&self) -> bool {
        *self.drained.borrow()
    }

    /// Waits until the inbound queue is closed and empty.
    ///
    /// Also resolves if the task died without finishing the queue, since
    /// nothing more will be applied after that either.
    pub async fn wait_drained(&self) {
        let mut drained = self.drained.clone();
        let _ = drained.wait_for(|done| *done).await;
    }

    /// Waits for the task itself to finish.
    pub async fn join(self) -> Result<(), JoinError> {
        self.task.await
    }
}

/// Spawns a dispatcher task.
pub fn spawn_dispatcher(
    state: Arc<SharedState>,
    inbound: InboundReceiver,
) -> DispatcherHandle {
    let (done, drained) = watch::channel(false);
    let task = tokio::spawn(async move {
        Dispatcher::new(state, inbound).run().await;
        done.send_replace(true);
    });
    DispatcherHandle { drained, task }
}
