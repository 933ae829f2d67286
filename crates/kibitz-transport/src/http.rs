//! HTTP long-poll transport using `reqwest`.
//!
//! KGS multiplexes both directions through a single URL:
//!
//! ```text
//! POST {"type":"LOGIN",...}   → 200, sets the session cookie
//! GET                         → 200, {"messages":[...]} (blocks until news)
//! POST {"type":"...",...}     → 200 (the answer arrives in a later GET)
//! ```
//!
//! The session token is therefore a cookie jar. Each login builds its own
//! `reqwest::Client` with a private cookie store, and that client *is* the
//! token: dropping it forgets the session.

use std::time::Duration;

use kibitz_protocol::{Codec, Event, JsonCodec, Request};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;

use crate::{AuthError, Credentials, Transport, TransportError};

/// The public KGS JSON endpoint.
pub const KGS_JSON_URL: &str = "http://www.gokgs.com/json/access";

/// Settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Endpoint for every call.
    pub url: String,

    /// Per-request bound enforced by `reqwest`. Kept above the session
    /// loop's poll timeout so the loop reports the timeout, not the client.
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            url: KGS_JSON_URL.to_string(),
            request_timeout: Duration::from_secs(70),
        }
    }
}

/// A [`Transport`] speaking the KGS JSON protocol over HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    config: HttpConfig,
    codec: JsonCodec,
}

/// Token of an [`HttpTransport`] session: a client holding the cookies.
#[derive(Debug)]
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with the given settings.
    pub fn new(config: HttpConfig) -> Self {
        Self {
            config,
            codec: JsonCodec,
        }
    }

    /// Creates a transport for another endpoint (a proxy, a test server).
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(HttpConfig {
            url: url.into(),
            ..HttpConfig::default()
        })
    }

    /// Returns the endpoint this transport talks to.
    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn post(
        &self,
        client: &reqwest::Client,
        operation: &'static str,
        request: &Request,
    ) -> Result<(), TransportError> {
        let body = self.codec.encode(request)?;
        let response = client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| self.request_error(operation, e))?;

        expect_ok(operation, response.status())
    }

    fn request_error(
        &self,
        operation: &'static str,
        e: reqwest::Error,
    ) -> TransportError {
        if e.is_timeout() {
            return TransportError::Timeout {
                operation,
                after: self.config.request_timeout,
            };
        }
        let io = io_error(e);
        if operation == "poll" {
            TransportError::PollFailed(io)
        } else {
            TransportError::SendFailed(io)
        }
    }
}

impl Transport for HttpTransport {
    type Token = HttpSession;

    async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<HttpSession, AuthError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.config.request_timeout)
            .build()
            .map_err(|e| {
                AuthError::Unreachable(std::io::Error::other(e))
            })?;

        let body = self.codec.encode(&credentials.login_request())?;
        let response = client
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/json;charset=UTF-8")
            .body(body)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(io_error(e)))?;

        if response.status() != StatusCode::OK {
            return Err(AuthError::Rejected(response.status().as_u16()));
        }

        tracing::info!(user = %credentials.name, url = %self.config.url, "logged in");
        Ok(HttpSession { client })
    }

    async fn poll(
        &self,
        token: &HttpSession,
    ) -> Result<Vec<Event>, TransportError> {
        let response = token
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|e| self.request_error("poll", e))?;
        expect_ok("poll", response.status())?;

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error("poll", e))?;

        let mut events = Vec::new();
        for decoded in self.codec.decode_messages(&body)? {
            match decoded {
                Ok(event) => events.push(event),
                // One bad message must not cost us the rest of the batch.
                Err(e) => tracing::warn!(error = %e, "skipping undecodable message"),
            }
        }
        tracing::trace!(count = events.len(), "poll returned");
        Ok(events)
    }

    async fn send(
        &self,
        token: &HttpSession,
        request: &Request,
    ) -> Result<(), TransportError> {
        self.post(&token.client, "send", request).await
    }

    async fn logout(&self, token: &HttpSession) -> Result<(), TransportError> {
        self.post(&token.client, "logout", &Request::Logout).await
    }
}

/// Keeps reqwest's own error as the source. Only a failed connect has a
/// precise kind; anything else (a reset, a bad body, a redirect loop) is
/// left as `Other`.
fn io_error(e: reqwest::Error) -> std::io::Error {
    if e.is_connect() {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e)
    } else {
        std::io::Error::other(e)
    }
}

fn expect_ok(
    operation: &'static str,
    status: StatusCode,
) -> Result<(), TransportError> {
    if status == StatusCode::OK {
        Ok(())
    } else {
        Err(TransportError::Status {
            operation,
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_kgs() {
        let transport = HttpTransport::default();
        assert_eq!(transport.url(), KGS_JSON_URL);
        assert!(transport.config.request_timeout > Duration::from_secs(60));
    }

    #[test]
    fn test_with_url_keeps_default_timeout() {
        let transport = HttpTransport::with_url("http://127.0.0.1:1/json");
        assert_eq!(transport.url(), "http://127.0.0.1:1/json");
        assert_eq!(
            transport.config.request_timeout,
            HttpConfig::default().request_timeout
        );
    }

    #[test]
    fn test_expect_ok_maps_other_statuses() {
        assert!(expect_ok("poll", StatusCode::OK).is_ok());
        match expect_ok("send", StatusCode::UNAUTHORIZED) {
            Err(TransportError::Status { operation, status }) => {
                assert_eq!(operation, "send");
                assert_eq!(status, 401);
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
