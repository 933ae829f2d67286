//! How the session loop is told to stop, and how it says it has.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Where the session loop is in its life.
///
/// ```text
/// Running ──(stop signal / LOGOUT sent)──→ Stopped
///    │
///    └──(transport error, queue gone)──→ Failed(reason)
/// ```
///
/// Published through a `tokio::sync::watch` channel so any number of
/// observers can read the latest value or wait for a change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStatus {
    Running,
    /// Ended on request.
    Stopped,
    /// Ended on an unrecoverable error; the state stays frozen at its
    /// last value.
    Failed(String),
}

impl LoopStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// `true` once the loop has ended, either way.
    pub fn is_finished(&self) -> bool {
        !self.is_running()
    }
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Cooperative stop flag, checked at the top of every loop cycle.
///
/// Setting it does not interrupt a poll already in flight; the loop
/// notices on its next cycle, so stopping can take up to one poll.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let signal = StopSignal::new();
        let other = signal.clone();
        assert!(!other.is_stopped());

        signal.stop();

        assert!(other.is_stopped());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(LoopStatus::Running.to_string(), "running");
        assert_eq!(
            LoopStatus::Failed("poll timed out".into()).to_string(),
            "failed: poll timed out"
        );
        assert!(LoopStatus::Stopped.is_finished());
    }
}
