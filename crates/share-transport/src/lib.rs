//! Resilient HTTP transport for the Dexcom Share client
//!
//! Defines the `HttpSend` capability that decouples the client from the
//! concrete HTTP stack. `ReqwestSender` is the production implementation;
//! tests inject scripted senders instead of mocking the network.
//!
//! `ResilientTransport` wraps a single logical request with retry-on-status
//! and retry-on-network-error semantics. Delays come from the server's
//! `Retry-After` hint when present, otherwise from exponential backoff with
//! full jitter (`backoff::delay`). All delays are capped by the policy.

pub mod backoff;
pub mod error;
pub mod retry;
pub mod sender;

pub use error::{Error, Result};
pub use retry::{ResilientTransport, RetryPolicy, parse_retry_after};
pub use sender::ReqwestSender;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};

/// A fully-built request that can be replayed on every retry attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    /// POST with a JSON body and the fixed JSON headers the Share API expects.
    pub fn post_json(url: Url, body: &serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: json_headers(),
            body: Bytes::from(body.to_string()),
        }
    }
}

/// Response with the body already buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a header, replacing any previous value under `name`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Headers sent with every Share API request.
pub fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("application/json"));
    headers
}

/// Boxed future returned by `HttpSend::send`.
pub type SendFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;

/// The single HTTP round trip underneath the retry loop.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn HttpSend>`).
/// Implementations report connection failures and timeouts as `Err`; any
/// received response, whatever its status, is `Ok`.
pub trait HttpSend: Send + Sync {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> SendFuture<'a>;
}
