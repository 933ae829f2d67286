use std::time::Duration;

/// Timing knobs for the session loop.
///
/// ```
/// use std::time::Duration;
/// use kibitz_session::SessionConfig;
///
/// let config = SessionConfig::default().poll_timeout(Duration::from_secs(30));
/// assert_eq!(config.idle_pause, Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on one `poll`. Exceeding it ends the loop with
    /// `TransportError::Timeout`.
    ///
    /// Default: 60 seconds.
    pub poll_timeout: Duration,

    /// Sleep after a cycle that had no request to send.
    ///
    /// Default: 1 second.
    pub idle_pause: Duration,
}

impl SessionConfig {
    pub fn poll_timeout(mut self, after: Duration) -> Self {
        self.poll_timeout = after;
        self
    }

    pub fn idle_pause(mut self, pause: Duration) -> Self {
        self.idle_pause = pause;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(60),
            idle_pause: Duration::from_secs(1),
        }
    }
}
