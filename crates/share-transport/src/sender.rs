//! `HttpSend` backed by a shared `reqwest::Client`

use std::time::Duration;

use tracing::debug;

use crate::error::Error;
use crate::{HttpRequest, HttpResponse, HttpSend, SendFuture};

/// Production sender. Each request carries its own timeout so one stalled
/// upstream call cannot hang the retry loop.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestSender {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

fn map_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Network(e.to_string())
    }
}

impl HttpSend for ReqwestSender {
    fn send<'a>(&'a self, request: &'a HttpRequest) -> SendFuture<'a> {
        Box::pin(async move {
            let response = self
                .client
                .request(request.method.clone(), request.url.clone())
                .headers(request.headers.clone())
                .timeout(self.timeout)
                .body(request.body.clone())
                .send()
                .await
                .map_err(map_error)?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(map_error)?;
            debug!(status = status.as_u16(), bytes = body.len(), "upstream responded");

            Ok(HttpResponse {
                status,
                headers,
                body,
            })
        })
    }
}
