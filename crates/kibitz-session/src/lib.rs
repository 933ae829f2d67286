//! Session loop for Kibitz.
//!
//! Owns one authenticated long-poll session: it polls the [`Transport`]
//! for events, forwards them to the inbound queue, and flushes queued
//! requests one per cycle.
//!
//! # How it fits in the stack
//!
//! ```text
//! kibitz (client facade)     ← enqueues requests, observes LoopStatus
//!     ↕
//! kibitz-session (this crate) ← SessionLoop, StopSignal, LoopStatus
//!     ↕
//! kibitz-transport           ← login / poll / send / logout
//! ```
//!
//! Events leave through a plain `tokio::sync::mpsc` sender, so this crate
//! doesn't know who consumes them.
//!
//! [`Transport`]: kibitz_transport::Transport

mod config;
mod error;
mod session_loop;
mod status;

pub use config::SessionConfig;
pub use error::SessionError;
pub use session_loop::{
    OutboundReceiver, OutboundSender, SessionHandle, SessionLoop,
    outbound_queue, spawn_session, wait_finished,
};
pub use status::{LoopStatus, StopSignal};
