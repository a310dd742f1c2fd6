//! Retry loop around a single HTTP request
//!
//! Network failures and retryable statuses (429/5xx by default) are retried
//! up to `max_attempts`. A `Retry-After` hint (delta-seconds or HTTP-date)
//! takes precedence over computed backoff, but is clamped to `max_delay` so a
//! buggy or hostile server cannot park the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::{HttpRequest, HttpResponse, HttpSend, backoff};

/// How the transport retries transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(4000),
            jitter: true,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryPolicy {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    /// Backoff delay after a failed `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        backoff::delay(attempt, self.base_delay, self.max_delay, self.jitter)
    }
}

/// Parse a `Retry-After` value as delta-seconds or an HTTP-date.
///
/// Only the IMF-fixdate form of HTTP-date (`Sun, 06 Nov 1994 08:49:37 GMT`)
/// is recognized. The obsolete RFC 850 and asctime forms return `None`, so
/// the caller falls back to backoff. Dates in the past yield zero. Returns
/// `None` for anything else, including negative numbers.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = date.with_timezone(&Utc) - now;
    Some(remaining.to_std().unwrap_or(Duration::ZERO))
}

fn retry_hint(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Utc::now())
}

fn record_attempt() {
    metrics::counter!("share_http_attempts_total").increment(1);
}

fn record_retry(reason: &'static str) {
    metrics::counter!("share_http_retries_total", "reason" => reason).increment(1);
}

/// Executes requests through an injected `HttpSend` with retries.
///
/// Holds no per-call state; one instance is shared by every request a client
/// makes.
#[derive(Clone)]
pub struct ResilientTransport {
    sender: Arc<dyn HttpSend>,
    policy: RetryPolicy,
}

impl ResilientTransport {
    pub fn new(sender: Arc<dyn HttpSend>, policy: RetryPolicy) -> Self {
        Self { sender, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request`, retrying transient failures.
    ///
    /// Returns the first response whose status is not retryable, successful
    /// or not; interpreting error bodies is the caller's job. When attempts
    /// run out, returns the last network failure or
    /// `Error::RetriesExhausted` carrying the last status and body.
    #[instrument(skip_all, fields(method = %request.method, path = %request.url.path()))]
    pub async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1u32;

        loop {
            let is_final = attempt >= max_attempts;
            record_attempt();

            match self.sender.send(request).await {
                Err(e) => {
                    if is_final {
                        warn!(attempt, error = %e, "request failed, no attempts left");
                        return Err(e);
                    }
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "request failed, retrying"
                    );
                    record_retry("network");
                    tokio::time::sleep(delay).await;
                }
                Ok(response) if !self.policy.is_retryable(response.status) => {
                    debug!(attempt, status = response.status.as_u16(), "response received");
                    return Ok(response);
                }
                Ok(response) => {
                    let status = response.status.as_u16();
                    if is_final {
                        warn!(attempt, status, "retryable status, no attempts left");
                        return Err(Error::RetriesExhausted {
                            status,
                            attempts: attempt,
                            body: response.body,
                        });
                    }
                    let delay = match retry_hint(&response.headers) {
                        Some(hint) => hint.min(self.policy.max_delay),
                        None => self.policy.backoff(attempt),
                    };
                    warn!(
                        attempt,
                        status,
                        delay_ms = delay.as_millis() as u64,
                        "retryable status, retrying"
                    );
                    record_retry("status");
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }
}
