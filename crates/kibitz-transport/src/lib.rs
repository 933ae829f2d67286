//! Transport abstraction layer for Kibitz.
//!
//! Provides the [`Transport`] trait: the four operations a long-poll
//! session needs from the network: `login`, `poll`, `send`, `logout`.
//! Everything above this crate (session loop, dispatcher, client) is
//! written against the trait, so tests swap in a scripted transport and
//! production uses HTTP.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`, cookie-based
//!   sessions against the KGS JSON endpoint

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::{AuthError, TransportError};
#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpSession, HttpTransport, KGS_JSON_URL};

use std::fmt;
use std::future::Future;

use kibitz_protocol::{Event, Request};

/// Account name and password for one session.
#[derive(Clone)]
pub struct Credentials {
    pub name: String,
    pub password: String,
    /// Locale the server uses for its own text, e.g. `"en_US"`.
    pub locale: String,
}

impl Credentials {
    /// Creates credentials with the default `en_US` locale.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            locale: "en_US".to_string(),
        }
    }

    /// Overrides the locale.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// The `LOGIN` message for these credentials.
    pub fn login_request(&self) -> Request {
        Request::Login {
            name: self.name.clone(),
            password: self.password.clone(),
            locale: self.locale.clone(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .field("locale", &self.locale)
            .finish()
    }
}

/// The network side of a long-poll session.
///
/// `login` produces a [`Transport::Token`] bound to one authenticated
/// session; every other call borrows it. The token never leaves the
/// session loop, so callers of the public API can't reach it.
///
/// All calls return `Result`s; a bad status is a value the session loop
/// inspects, not a panic or an unwinding error.
///
/// The futures are declared `Send` so the loop can run on any worker
/// thread of a multi-threaded runtime.
pub trait Transport: Send + Sync + 'static {
    /// Opaque credential for one authenticated session.
    type Token: Send + Sync + 'static;

    /// Opens a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Token, AuthError>> + Send;

    /// Fetches the events the server queued since the previous poll,
    /// in delivery order. May block until something happens.
    fn poll(
        &self,
        token: &Self::Token,
    ) -> impl Future<Output = Result<Vec<Event>, TransportError>> + Send;

    /// Delivers one request. `Ok(())` is the server's acknowledgement.
    fn send(
        &self,
        token: &Self::Token,
        request: &Request,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Closes the session.
    fn logout(
        &self,
        token: &Self::Token,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_default_locale() {
        let creds = Credentials::new("alice", "secret");
        assert_eq!(creds.locale, "en_US");
        assert_eq!(creds.locale("fr_FR").locale, "fr_FR");
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let printed = format!("{:?}", Credentials::new("alice", "secret"));
        assert!(printed.contains("alice"));
        assert!(!printed.contains("secret"));
    }

    #[test]
    fn test_login_request_carries_credentials() {
        let request = Credentials::new("alice", "secret").login_request();
        assert_eq!(
            request,
            Request::Login {
                name: "alice".into(),
                password: "secret".into(),
                locale: "en_US".into(),
            }
        );
    }
}
