//! Raw HTTP transports.
//!
//! A [`Transport`] performs exactly one GET and reports either the HTTP
//! status with its body or a network-level failure. Retry policy lives in
//! [`RetryingGateway`](super::RetryingGateway), not here.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};

use crate::error::VepError;

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request that never produced an HTTP status (DNS, connect, timeout, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub msg: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for TransportError {}

/// One-shot HTTP GET
///
/// Implementations:
/// - [`ReqwestTransport`] for the real service
/// - [`MockTransport`] for tests
pub trait Transport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        (**self).get(url)
    }
}

/// Blocking reqwest transport with JSON headers.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the given request timeout and User-Agent.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, VepError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(user_agent).map_err(|e| VepError::Config {
            msg: format!("Invalid user agent '{}': {}", user_agent, e),
        })?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| VepError::Io {
                msg: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().map_err(|e| TransportError {
            msg: format!("HTTP request failed: {}", e),
        })?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError {
            msg: format!("Failed to read response body: {}", e),
        })?;
        Ok(HttpResponse { status, body })
    }
}

/// A scripted reply for [`MockTransport`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Respond with a status and body
    Status(u16, String),
    /// Fail before any status is received
    NetworkError(String),
}

impl MockReply {
    /// HTTP 200 with a JSON body
    pub fn json(value: &serde_json::Value) -> Self {
        MockReply::Status(200, value.to_string())
    }

    /// A bare status with an empty body
    pub fn status(status: u16) -> Self {
        MockReply::Status(status, String::new())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        MockReply::NetworkError(msg.into())
    }
}

#[derive(Debug)]
struct Route {
    pattern: String,
    replies: VecDeque<MockReply>,
    last: MockReply,
}

/// In-memory transport that replays scripted replies and records every call.
///
/// Routes match when the URL contains the route pattern; the first matching
/// route wins. A route replays its replies in order and then keeps repeating
/// the last one. Unmatched URLs get HTTP 404.
///
/// # Example
///
/// ```
/// use ferro_vep::gateway::{MockReply, MockTransport, Transport};
///
/// let mock = MockTransport::new();
/// mock.respond("/map/", MockReply::status(503));
/// assert_eq!(mock.get("http://host/map/x").unwrap().status, 503);
/// assert_eq!(mock.call_count("/map/"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer URLs containing `pattern` with `reply`.
    pub fn respond(&self, pattern: &str, reply: MockReply) {
        self.respond_sequence(pattern, vec![reply]);
    }

    /// Answer URLs containing `pattern` with `replies` in order.
    pub fn respond_sequence(&self, pattern: &str, replies: Vec<MockReply>) {
        let last = replies
            .last()
            .cloned()
            .unwrap_or_else(|| MockReply::status(404));
        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        routes.push(Route {
            pattern: pattern.to_string(),
            replies: replies.into(),
            last,
        });
    }

    /// All URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requested URLs containing `pattern`.
    pub fn call_count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let reply = {
            let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
            routes
                .iter_mut()
                .find(|route| url.contains(&route.pattern))
                .map(|route| {
                    route
                        .replies
                        .pop_front()
                        .unwrap_or_else(|| route.last.clone())
                })
                .unwrap_or_else(|| MockReply::status(404))
        };

        match reply {
            MockReply::Status(status, body) => Ok(HttpResponse { status, body }),
            MockReply::NetworkError(msg) => Err(TransportError { msg }),
        }
    }
}
