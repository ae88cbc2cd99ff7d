//! Outbound HTTP access to the annotation and mapping services.
//!
//! Requests go through two layers:
//!
//! - [`Transport`]: one GET, reporting a status or a network failure
//! - [`RetryingGateway`]: retry policy on top of a transport
//!
//! Production code uses [`ReqwestTransport`]; tests script responses with
//! [`MockTransport`] and assert on its call log.
//!
//! # Example
//!
//! ```
//! use ferro_vep::gateway::{MockReply, MockTransport, RetryPolicy, RetryingGateway};
//!
//! let mock = MockTransport::new();
//! mock.respond("/vep/", MockReply::status(400));
//!
//! let gateway = RetryingGateway::new(&mock, RetryPolicy::no_backoff(10));
//! assert!(gateway.get("http://host/vep/human/region/x").is_none());
//! assert_eq!(mock.call_count("/vep/"), 1);
//! ```

mod retry;
mod transport;

pub use retry::{GatewayStats, RetryPolicy, RetryingGateway, DEFAULT_MAX_ATTEMPTS};
pub use transport::{
    HttpResponse, MockReply, MockTransport, ReqwestTransport, Transport, TransportError,
};
